//! Bingo Roulette: multi-team board rotation tracker.
//!
//! Each team walks a fixed rotation of six lettered boards. A board has nine tiles;
//! clearing all nine on a team's first pass unlocks a bonus challenge, on later passes
//! the team moves straight on. State lives in a [`Tracker`], is driven through
//! [`BingoService`] and is committed to disk as one atomic JSON snapshot after every
//! mutation.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub mod boards;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod quips;
mod restore;
pub mod service;
pub mod snapshot;
pub mod tracker;

pub use commands::{normalize_team_name, team_display, team_key_from_channel, Command, Invocation};
pub use config::BingoConfig;
pub use dispatch::{BoardRenderer, Dispatcher, Message, MessageSink};
pub use error::BingoError;
pub use quips::{QuipScope, QuipSelector};
pub use service::{BingoService, LoadSource};
pub use snapshot::{Snapshot, SnapshotSource, SnapshotStore};
pub use tracker::{BonusResolution, Outcome, PointKind, ProgressView, Standing, Tracker};

// ==================== CONSTANTS ====================

/// Tiles on every board, numbered 1..=9
pub const TILES_PER_BOARD: u8 = 9;

/// Minimum spacing between two effective reset-all executions
pub const DEFAULT_RESET_ALL_COOLDOWN_MS: u64 = 1_000;

/// Snapshot file name inside the data directory
pub const DEFAULT_STATE_FILE: &str = "bingo_state.json";

/// Data directory used when neither config nor `DATA_DIR` says otherwise
pub const DEFAULT_DATA_DIR: &str = "/data";

/// Is `tile` a valid tile number?
pub fn is_valid_tile(tile: i64) -> bool {
    (1..=TILES_PER_BOARD as i64).contains(&tile)
}

/// The full set {1..=9}
pub fn all_tiles() -> TileSet {
    (1..=TILES_PER_BOARD).collect()
}

// ==================== TYPES ====================

/// Tile numbers checked off on the current board
pub type TileSet = BTreeSet<u8>;

/// Category → quips already shown; cleared per category once the pool runs dry
pub type QuipMemory = BTreeMap<String, BTreeSet<String>>;

/// One of the six boards
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BoardLetter {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl BoardLetter {
    pub const ALL: [BoardLetter; 6] = [
        BoardLetter::A,
        BoardLetter::B,
        BoardLetter::C,
        BoardLetter::D,
        BoardLetter::E,
        BoardLetter::F,
    ];

    pub fn as_char(self) -> char {
        match self {
            BoardLetter::A => 'A',
            BoardLetter::B => 'B',
            BoardLetter::C => 'C',
            BoardLetter::D => 'D',
            BoardLetter::E => 'E',
            BoardLetter::F => 'F',
        }
    }

    /// Case-insensitive
    pub fn from_char(c: char) -> Option<BoardLetter> {
        BoardLetter::ALL
            .into_iter()
            .find(|b| b.as_char() == c.to_ascii_uppercase())
    }
}

impl fmt::Display for BoardLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for BoardLetter {
    type Err = BingoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => {
                BoardLetter::from_char(c).ok_or_else(|| BingoError::InvalidBoard(s.to_string()))
            }
            _ => Err(BingoError::InvalidBoard(s.to_string())),
        }
    }
}

/// A team's fixed board order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rotation(Vec<BoardLetter>);

impl Rotation {
    pub fn new(boards: Vec<BoardLetter>) -> Self {
        Rotation(boards)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn board(&self, index: usize) -> Option<BoardLetter> {
        self.0.get(index).copied()
    }

    pub fn position(&self, letter: BoardLetter) -> Option<usize> {
        self.0.iter().position(|b| *b == letter)
    }

    pub fn letters(&self) -> &[BoardLetter] {
        &self.0
    }
}

impl FromStr for Rotation {
    type Err = BingoError;

    /// "ACEBDF" or "A,C,E,B,D,F"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .filter(|c| !c.is_whitespace() && *c != ',')
            .map(|c| BoardLetter::from_char(c).ok_or_else(|| BingoError::InvalidBoard(c.to_string())))
            .collect::<Result<Vec<_>, _>>()
            .map(Rotation)
    }
}

/// Per-team progress record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamState {
    /// Index into the team's rotation
    pub board_index: usize,

    /// Tiles checked on the current board (1..=9)
    pub completed_tiles: TileSet,

    /// Nine tiles done on a first-pass board, waiting for finish/skip
    pub bonus_active: bool,

    /// Tile points (one per completed tile, adjusted by admins)
    pub points: u32,

    /// Only ever credited by admins
    pub bonus_points: u32,

    /// One-time gate set by `startboard`
    pub started: bool,

    /// Rotation wrapped at least once; no more bonus challenges
    pub looped: bool,

    /// Frozen by an admin; terminal
    pub finished: bool,

    /// Per-team quip history
    pub used_quips: QuipMemory,
}

impl TeamState {
    pub fn totals(&self) -> Totals {
        Totals {
            points: self.points,
            bonus_points: self.bonus_points,
        }
    }

    pub fn board_full(&self) -> bool {
        self.completed_tiles.len() >= TILES_PER_BOARD as usize
    }

    /// Tiles still open on the current board, ascending
    pub fn remaining_tiles(&self) -> Vec<u8> {
        (1..=TILES_PER_BOARD)
            .filter(|t| !self.completed_tiles.contains(t))
            .collect()
    }
}

/// Point totals reported back after every operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub points: u32,
    pub bonus_points: u32,
}

impl Totals {
    pub fn total(&self) -> u32 {
        self.points.saturating_add(self.bonus_points)
    }
}

impl fmt::Display for Totals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "🧮 **Points:** {} | **Bonus Points:** {} | **Total:** {}",
            self.points,
            self.bonus_points,
            self.total()
        )
    }
}
