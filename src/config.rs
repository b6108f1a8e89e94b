//! Runtime configuration: where snapshots live, which teams play which rotation,
//! and who may run admin commands.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    normalize_team_name, BingoError, Rotation, DEFAULT_DATA_DIR, DEFAULT_RESET_ALL_COOLDOWN_MS,
    DEFAULT_STATE_FILE,
};

/// Env var overriding the data directory
pub const DATA_DIR_ENV: &str = "DATA_DIR";

/// Env var naming a JSON file with config overrides
pub const CONFIG_FILE_ENV: &str = "BINGO_CONFIG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BingoConfig {
    pub data_dir: PathBuf,

    pub state_file: String,

    /// Team key → board order
    pub teams: BTreeMap<String, Rotation>,

    /// Principals allowed to run admin commands
    pub admins: BTreeSet<u64>,

    pub reset_all_cooldown_ms: u64,
}

impl Default for BingoConfig {
    fn default() -> Self {
        let teams = [
            ("team1", "ACEBDF"),
            ("team2", "DFBACE"),
            ("team3", "BECFAD"),
            ("team4", "EBFCDA"),
        ]
        .into_iter()
        .filter_map(|(team, order)| order.parse().ok().map(|r| (team.to_string(), r)))
        .collect();

        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            state_file: DEFAULT_STATE_FILE.to_string(),
            teams,
            admins: BTreeSet::new(),
            reset_all_cooldown_ms: DEFAULT_RESET_ALL_COOLDOWN_MS,
        }
    }
}

impl BingoConfig {
    /// Defaults, then `BINGO_CONFIG` file, then `DATA_DIR`
    pub fn from_env() -> Result<Self, BingoError> {
        let mut config = match std::env::var(CONFIG_FILE_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(path.trim()))?,
            _ => Self::default(),
        };

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir.trim());
            }
        }

        config.validate()?;
        log::info!(
            "[CONFIG] data_dir:{} teams:{} admins:{}",
            config.data_dir.display(),
            config.teams.len(),
            config.admins.len()
        );
        Ok(config)
    }

    /// Fields missing from the file keep their defaults
    pub fn from_file(path: &Path) -> Result<Self, BingoError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BingoError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, BingoError> {
        let config: BingoConfig =
            serde_json::from_str(raw).map_err(|e| BingoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), BingoError> {
        if self.teams.is_empty() {
            return Err(BingoError::Config("no teams configured".into()));
        }
        if self.state_file.trim().is_empty() {
            return Err(BingoError::Config("state_file is empty".into()));
        }

        for (team, rotation) in &self.teams {
            if team.is_empty()
                || normalize_team_name(team) != *team
                || team.contains(|c: char| c == '-' || c.is_whitespace())
            {
                return Err(BingoError::Config(format!("team key '{}' is not normalized", team)));
            }
            if rotation.is_empty() {
                return Err(BingoError::Config(format!("team '{}' has an empty rotation", team)));
            }
            let distinct: BTreeSet<_> = rotation.letters().iter().collect();
            if distinct.len() != rotation.len() {
                return Err(BingoError::Config(format!("team '{}' repeats a board", team)));
            }
        }
        Ok(())
    }

    pub fn state_path(&self) -> PathBuf {
        self.data_dir.join(&self.state_file)
    }

    pub fn reset_all_cooldown(&self) -> Duration {
        Duration::from_millis(self.reset_all_cooldown_ms)
    }

    pub fn is_admin(&self, principal: u64) -> bool {
        self.admins.contains(&principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoardLetter;

    #[test]
    fn test_default_config() {
        let config = BingoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.teams.len(), 4);
        let team1 = &config.teams["team1"];
        assert_eq!(
            team1.letters(),
            &[
                BoardLetter::A,
                BoardLetter::C,
                BoardLetter::E,
                BoardLetter::B,
                BoardLetter::D,
                BoardLetter::F
            ]
        );
        assert_eq!(config.state_path(), PathBuf::from("/data/bingo_state.json"));
        assert_eq!(config.reset_all_cooldown(), Duration::from_secs(1));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = BingoConfig::from_json(
            r#"{"data_dir": "/tmp/bingo", "admins": [42], "teams": {"red": ["B", "A"]}}"#,
        )
        .unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/tmp/bingo"));
        assert_eq!(config.state_file, DEFAULT_STATE_FILE);
        assert!(config.is_admin(42));
        assert!(!config.is_admin(7));
        assert_eq!(config.teams.len(), 1);
        assert_eq!(config.teams["red"].board(0), Some(BoardLetter::B));
    }

    #[test]
    fn test_validation_rejects_bad_rotations() {
        let dup = BingoConfig::from_json(r#"{"teams": {"team1": ["A", "A"]}}"#);
        assert!(matches!(dup, Err(BingoError::Config(_))));

        let empty = BingoConfig::from_json(r#"{"teams": {"team1": []}}"#);
        assert!(matches!(empty, Err(BingoError::Config(_))));

        let none = BingoConfig::from_json(r#"{"teams": {}}"#);
        assert!(matches!(none, Err(BingoError::Config(_))));

        let unnormalized = BingoConfig::from_json(r#"{"teams": {"Team-1": ["A"]}}"#);
        assert!(matches!(unnormalized, Err(BingoError::Config(_))));

        let bad_letter = BingoConfig::from_json(r#"{"teams": {"team1": ["Z"]}}"#);
        assert!(bad_letter.is_err());
    }
}
