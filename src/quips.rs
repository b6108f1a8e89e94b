//! Non-repeating quip picker.
//!
//! History is kept per (scope, category). A pick is uniform over the pool entries not
//! yet used for that pair; once everything has been used the history for the pair is
//! cleared and the whole pool is available again.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::QuipMemory;

// ==================== CATEGORIES ====================

pub const TILE_COMPLETE: &str = "tile_complete";
pub const TILE_REMOVE: &str = "removetile";
pub const START_BOARD: &str = "start_board";
pub const BONUS_REVEAL: &str = "bonus_reveal";
pub const BONUS_COMPLETE: &str = "bonus_complete";
pub const BONUS_SKIP: &str = "bonus_skip";
pub const LOOP_ADVANCE: &str = "loop_advance";
pub const PROGRESS: &str = "progress";
pub const POINTS: &str = "points";
pub const RESET_ALL: &str = "resetall";

// ==================== POOLS ====================
// `{team}` and `{letter}` are filled in by `fill`.

pub const TILE_COMPLETE_POOL: &[&str] = &[
    "A tile? From you? Fine. Point awarded, try not to gloat.",
    "I had a whole speech about your downfall. Saving it for later.",
    "Tile done. The scoreboard sighed and updated itself.",
    "Against every prediction I made, that tile is finished.",
    "Competence detected. Logging it before it wears off.",
];

pub const TILE_REMOVE_POOL: &[&str] = &[
    "Reversing progress. Bold. Point removed.",
    "You pressed undo on success. Minus one.",
    "Tile unchecked. History has been edited.",
    "Backpedaling noted. The scoreboard remembers.",
];

pub const START_BOARD_POOL: &[&str] = &[
    "Board {letter} is live for {team}. Go make questionable decisions.",
    "{team}, Board {letter} awaits. Try to look like you planned this.",
    "Board {letter} unlocked. {team}, the clock is judging you.",
];

pub const BONUS_REVEAL_POOL: &[&str] = &[
    "{team} cleared all nine tiles on Board {letter}. The Bonus Tile stirs.",
    "Board {letter} is done. {team}, a Bonus Tile wants a word.",
    "Nine for nine on Board {letter}. {team}, finish the bonus or skip it loudly.",
];

pub const BONUS_COMPLETE_POOL: &[&str] = &[
    "Bonus conquered. The refs will count the spoils.",
    "You actually did the bonus. I need to sit down.",
    "Bonus tile done. Proof goes to the refs, points come later.",
];

pub const BONUS_SKIP_POOL: &[&str] = &[
    "Skipping the bonus. Discretion, valor, all that.",
    "Bonus declined. Onward, cowards. Affectionately.",
    "No bonus today. The next board does not care either way.",
];

pub const LOOP_ADVANCE_POOL: &[&str] = &[
    "No encore Bonus Tile for you. You've already seen that show. Onward.",
    "Second lap, no bonus. Next board.",
];

pub const PROGRESS_POOL: &[&str] = &[
    "Here is where you stand. Squint if it helps.",
    "Progress report, served lukewarm.",
    "Still going. Respectable. Barely.",
];

pub const POINTS_POOL: &[&str] = &[
    "Counting your points. Slowly. For drama.",
    "The numbers do not lie. They do tease.",
];

pub const RESET_ALL_POOL: &[&str] = &[
    "⚙️ **All teams have been reset.** Fresh boards, same chaos.",
    "⚙️ **All teams have been reset.** Nobody remembers anything.",
];

/// Replace `{team}` / `{letter}` placeholders
pub fn fill(template: &str, team: &str, letter: &str) -> String {
    template.replace("{team}", team).replace("{letter}", letter)
}

/// Whose history a pick counts against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuipScope<'a> {
    Team(&'a str),
    Global,
}

/// Seedable random source plus the pick rule
pub struct QuipSelector {
    rng: StdRng,
}

impl QuipSelector {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Pick from `pool`, recording the choice in `used[category]`.
    /// Returns `None` only for an empty pool.
    pub fn pick<'p>(
        &mut self,
        used: &mut QuipMemory,
        category: &str,
        pool: &[&'p str],
    ) -> Option<&'p str> {
        if pool.is_empty() {
            return None;
        }

        let history = used.entry(category.to_string()).or_default();
        let mut available: Vec<&'p str> = pool
            .iter()
            .copied()
            .filter(|q| !history.contains(*q))
            .collect();

        if available.is_empty() {
            log::debug!("[QUIP] pool exhausted category:{} size:{}", category, pool.len());
            history.clear();
            available = pool.to_vec();
        }

        let choice = *available.choose(&mut self.rng)?;
        history.insert(choice.to_string());
        Some(choice)
    }
}

impl Default for QuipSelector {
    fn default() -> Self {
        Self::from_entropy()
    }
}

impl std::fmt::Debug for QuipSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuipSelector").finish_non_exhaustive()
    }
}
