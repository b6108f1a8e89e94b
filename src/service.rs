//! Async front door to the tracker.
//!
//! Every mutating call runs under its team's gate, mutates the shared [`Tracker`],
//! takes a snapshot while still holding the tracker lock and then commits it. Commit
//! failures are logged; the in-memory state stays authoritative until the next
//! successful write.

use std::collections::BTreeMap;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::quips::QuipScope;
use crate::snapshot::{Snapshot, SnapshotSource, SnapshotStore};
use crate::tracker::{BonusResolution, Outcome, PointKind, ProgressView, Standing, Tracker};
use crate::{BingoConfig, BingoError, BoardLetter, QuipSelector, TeamState, Totals};

/// Where startup state came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    Main,
    Backup,
    Fresh,
}

impl From<SnapshotSource> for LoadSource {
    fn from(source: SnapshotSource) -> Self {
        match source {
            SnapshotSource::Main => LoadSource::Main,
            SnapshotSource::Backup => LoadSource::Backup,
        }
    }
}

#[derive(Debug)]
pub struct BingoService {
    config: BingoConfig,
    tracker: Mutex<Tracker>,
    /// One gate per configured team
    gates: BTreeMap<String, Mutex<()>>,
    store: SnapshotStore,
}

impl BingoService {
    /// Default state for every configured team; nothing is read from disk yet
    pub fn init(config: BingoConfig) -> Result<Self, BingoError> {
        config.validate()?;
        let gates = config
            .teams
            .keys()
            .map(|team| (team.clone(), Mutex::new(())))
            .collect();
        let store = SnapshotStore::new(config.state_path());
        log::info!(
            "[SERVICE] init teams:{} state:{}",
            config.teams.len(),
            store.path().display()
        );

        Ok(Self {
            tracker: Mutex::new(Tracker::from_config(&config)),
            gates,
            store,
            config,
        })
    }

    /// Swap in a deterministic quip source
    pub fn with_selector(self, selector: QuipSelector) -> Self {
        Self {
            tracker: Mutex::new(self.tracker.into_inner().with_selector(selector)),
            ..self
        }
    }

    pub fn config(&self) -> &BingoConfig {
        &self.config
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    // ==================== LIFECYCLE ====================

    /// Merge the newest readable snapshot into the configured teams
    pub async fn load(&self) -> LoadSource {
        self.store.sweep_temp_files();

        let Some((snapshot, source)) = self.store.load() else {
            return LoadSource::Fresh;
        };
        let merged = self.tracker.lock().await.merge(snapshot);
        log::info!("[SERVICE] restored teams:{} source:{:?}", merged, source);
        source.into()
    }

    /// Final commit; unlike routine commits the error is returned
    pub async fn shutdown(&self) -> Result<(), BingoError> {
        let snapshot = self.tracker.lock().await.snapshot();
        self.store.save(&snapshot).await?;
        log::info!("[SERVICE] shutdown revision:{}", snapshot.revision);
        Ok(())
    }

    // ==================== TEAM OPERATIONS ====================

    pub async fn start_board(&self, team: &str) -> Result<Outcome, BingoError> {
        self.run(team, |t| t.start_board(team)).await
    }

    pub async fn complete_tile(&self, team: &str, tile: i64) -> Result<Outcome, BingoError> {
        self.run(team, |t| t.complete_tile(team, tile)).await
    }

    pub async fn remove_tile(&self, team: &str, tile: i64) -> Result<Outcome, BingoError> {
        self.run(team, |t| t.remove_tile(team, tile)).await
    }

    pub async fn resolve_bonus(
        &self,
        team: &str,
        resolution: BonusResolution,
    ) -> Result<Outcome, BingoError> {
        self.run(team, |t| t.resolve_bonus(team, resolution)).await
    }

    pub async fn tile_all(&self, team: &str) -> Result<Outcome, BingoError> {
        self.run(team, |t| t.tile_all(team)).await
    }

    pub async fn adjust_points(
        &self,
        team: &str,
        delta: i64,
        kind: PointKind,
    ) -> Result<Outcome, BingoError> {
        self.run(team, |t| t.adjust_points(team, delta, kind)).await
    }

    pub async fn set_board(&self, team: &str, letter: BoardLetter) -> Result<Outcome, BingoError> {
        self.run(team, |t| t.set_board(team, letter)).await
    }

    pub async fn advance_board(&self, team: &str) -> Result<Outcome, BingoError> {
        self.run(team, |t| t.advance_board(team)).await
    }

    pub async fn reset_team(&self, team: &str) -> Result<Outcome, BingoError> {
        self.run(team, |t| t.reset_team(team)).await
    }

    pub async fn finish_team(&self, team: &str) -> Result<Outcome, BingoError> {
        self.run(team, |t| t.finish_team(team)).await
    }

    /// Holds every team gate, acquired in key order
    pub async fn reset_all(&self) -> Outcome {
        let mut held = Vec::with_capacity(self.gates.len());
        for gate in self.gates.values() {
            held.push(gate.lock().await);
        }

        let (outcome, snapshot) = {
            let mut tracker = self.tracker.lock().await;
            let outcome = tracker.reset_all(Instant::now());
            let snapshot = outcome.mutates().then(|| tracker.snapshot());
            (outcome, snapshot)
        };
        if let Some(snapshot) = snapshot {
            self.commit(&snapshot).await;
        }
        outcome
    }

    // ==================== QUERIES ====================

    pub async fn progress(&self, team: &str) -> Result<ProgressView, BingoError> {
        self.tracker.lock().await.progress(team)
    }

    pub async fn points(&self, team: &str) -> Result<Totals, BingoError> {
        self.tracker.lock().await.points(team)
    }

    pub async fn standings(&self) -> Vec<Standing> {
        self.tracker.lock().await.standings()
    }

    pub async fn team(&self, team: &str) -> Result<TeamState, BingoError> {
        self.tracker.lock().await.team(team).cloned()
    }

    pub async fn snapshot(&self) -> Snapshot {
        self.tracker.lock().await.snapshot()
    }

    /// Pick a quip and persist the updated history
    pub async fn quip(
        &self,
        scope: QuipScope<'_>,
        category: &str,
        pool: &[&'static str],
    ) -> Option<&'static str> {
        let (choice, snapshot) = {
            let mut tracker = self.tracker.lock().await;
            let choice = tracker.quip(scope, category, pool);
            let snapshot = choice.is_some().then(|| tracker.snapshot());
            (choice, snapshot)
        };
        if let Some(snapshot) = snapshot {
            self.commit(&snapshot).await;
        }
        choice
    }

    // ==================== INTERNALS ====================

    fn gate(&self, team: &str) -> Result<&Mutex<()>, BingoError> {
        self.gates
            .get(team)
            .ok_or_else(|| BingoError::UnknownTeam(team.to_string()))
    }

    /// Gate → mutate → snapshot under the tracker lock → commit
    async fn run<F>(&self, team: &str, op: F) -> Result<Outcome, BingoError>
    where
        F: FnOnce(&mut Tracker) -> Result<Outcome, BingoError>,
    {
        let _gate = self.gate(team)?.lock().await;

        let (outcome, snapshot) = {
            let mut tracker = self.tracker.lock().await;
            let outcome = op(&mut tracker)?;
            let snapshot = outcome.mutates().then(|| tracker.snapshot());
            (outcome, snapshot)
        };

        if let Some(snapshot) = snapshot {
            self.commit(&snapshot).await;
        }
        Ok(outcome)
    }

    async fn commit(&self, snapshot: &Snapshot) {
        match self.store.save(snapshot).await {
            Ok(true) => {}
            Ok(false) => log::debug!("[SERVICE] superseded revision:{}", snapshot.revision),
            Err(e) => log::error!(
                "[SERVICE] commit failed revision:{} error:{}",
                snapshot.revision,
                e
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(dir: &tempfile::TempDir) -> BingoService {
        let config = BingoConfig {
            data_dir: dir.path().to_path_buf(),
            ..BingoConfig::default()
        };
        BingoService::init(config)
            .unwrap()
            .with_selector(QuipSelector::seeded(3))
    }

    #[tokio::test]
    async fn test_mutation_is_committed() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        svc.start_board("team1").await.unwrap();
        svc.complete_tile("team1", 6).await.unwrap();

        let on_disk = crate::snapshot::read_snapshot(svc.store().path()).unwrap();
        assert_eq!(on_disk.game_state["team1"].points, 1);
        assert!(on_disk.game_state["team1"].completed_tiles.contains(&6));
    }

    #[tokio::test]
    async fn test_rejected_operation_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        assert_eq!(svc.complete_tile("team1", 1).await, Err(BingoError::NotStarted));
        assert!(!svc.store().path().exists());
        assert_eq!(
            svc.start_board("team9").await,
            Err(BingoError::UnknownTeam("team9".into()))
        );
    }

    #[tokio::test]
    async fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let svc = service(&dir);
            assert_eq!(svc.load().await, LoadSource::Fresh);
            svc.start_board("team2").await.unwrap();
            svc.tile_all("team2").await.unwrap();
            svc.shutdown().await.unwrap();
        }

        let svc = service(&dir);
        assert_eq!(svc.load().await, LoadSource::Main);
        let state = svc.team("team2").await.unwrap();
        assert!(state.bonus_active);
        assert_eq!(state.points, 9);
    }

    #[tokio::test]
    async fn test_quip_history_persists() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        let pick = svc
            .quip(QuipScope::Team("team3"), "progress", &["only"])
            .await;
        assert_eq!(pick, Some("only"));

        let on_disk = crate::snapshot::read_snapshot(svc.store().path()).unwrap();
        assert!(on_disk.game_state["team3"].used_quips["progress"].contains("only"));
    }

    #[tokio::test]
    async fn test_reset_all_debounced() {
        let dir = tempfile::tempdir().unwrap();
        let svc = service(&dir);
        svc.start_board("team1").await.unwrap();
        assert_eq!(svc.reset_all().await, Outcome::AllReset { teams: 4 });
        svc.start_board("team1").await.unwrap();
        assert_eq!(svc.reset_all().await, Outcome::ResetAllIgnored);
        assert!(svc.team("team1").await.unwrap().started);
    }
}
