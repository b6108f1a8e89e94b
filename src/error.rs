use thiserror::Error;

/// Everything a bingo operation can reject with.
/// Display strings are what the caller shows to the channel, so keep them short.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BingoError {
    #[error("Invalid team name.")]
    UnknownTeam(String),

    #[error("Please specify a tile number from 1 to 9.")]
    TileOutOfRange(i64),

    #[error("Invalid board letter.")]
    InvalidBoard(String),

    #[error("Oops! You must use `!startboard` before you can do that.")]
    NotStarted,

    #[error("This team has already completed Bingo Roulette. No further progress can be made.")]
    Finished,

    #[error("This team is currently in a bonus challenge and cannot check tiles.")]
    BonusActive,

    #[error("There is no active Bonus Tile.")]
    NoActiveBonus,

    #[error("You are not allowed to use that command.")]
    Unauthorized,

    #[error("Unknown command.")]
    UnknownCommand(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Snapshot I/O failed: {0}")]
    Persistence(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl From<std::io::Error> for BingoError {
    fn from(e: std::io::Error) -> Self {
        BingoError::Persistence(e.to_string())
    }
}

impl From<serde_json::Error> for BingoError {
    fn from(e: serde_json::Error) -> Self {
        BingoError::Persistence(e.to_string())
    }
}
