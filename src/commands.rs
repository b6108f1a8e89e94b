//! Command routing: `!verb args` text → typed [`Command`], channel name → team key.

use crate::{BingoError, BoardLetter, PointKind};

/// Command prefix
pub const PREFIX: char = '!';

/// Trim + lowercase
pub fn normalize_team_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Channel "Team-1" → team key "team1"
pub fn team_key_from_channel(channel: &str) -> String {
    normalize_team_name(&channel.replace('-', ""))
}

/// Display name for a team key: "team1" → "Team 1"
pub fn team_display(team_key: &str) -> String {
    match team_key.trim().chars().last() {
        Some(c) => format!("Team {}", c),
        None => "Team".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    // -------------------- channel-scoped --------------------
    Tile(i64),
    StartBoard,
    FinishBonus,
    SkipBonus,
    Progress,
    Points,
    // -------------------- admin --------------------
    RemoveTile(i64),
    TileAll { team: String },
    SetBoard { letter: BoardLetter, team: String },
    SetNextBoard { team: String },
    AdjustPoints { kind: PointKind, delta: i64, team: String },
    Reset { team: String },
    ResetAll,
    PointsAllTeams,
    FinishEvent { team: String },
}

impl Command {
    pub fn parse(text: &str) -> Result<Command, BingoError> {
        let body = text
            .trim()
            .strip_prefix(PREFIX)
            .ok_or_else(|| BingoError::UnknownCommand(text.trim().to_string()))?;
        let mut words = body.split_whitespace();
        let verb = words.next().unwrap_or_default().to_lowercase();
        let args: Vec<&str> = words.collect();

        let command = match verb.as_str() {
            "startboard" => Command::StartBoard,
            "finishbonus" => Command::FinishBonus,
            "skipbonus" => Command::SkipBonus,
            "progress" => Command::Progress,
            "points" => Command::Points,
            "resetall" => Command::ResetAll,
            "pointsallteams" => Command::PointsAllTeams,
            "removetile" => Command::RemoveTile(
                parse_number(args.first()).ok_or(BingoError::Usage("!removetile <1-9>"))?,
            ),
            "tileall" => Command::TileAll {
                team: rest_as_team(&args).ok_or(BingoError::Usage("!tileall <team>"))?,
            },
            "setboard" => {
                let letter = args
                    .first()
                    .ok_or(BingoError::Usage("!setboard <letter> <team>"))?
                    .parse::<BoardLetter>()?;
                let team = rest_as_team(args.get(1..).unwrap_or_default())
                    .ok_or(BingoError::Usage("!setboard <letter> <team>"))?;
                Command::SetBoard { letter, team }
            }
            "setnextboard" => Command::SetNextBoard {
                team: rest_as_team(&args).ok_or(BingoError::Usage("!setnextboard <team>"))?,
            },
            "addpoints" => adjust(PointKind::Tile, 1, &args, "!addpoints <amount> <team>")?,
            "removepoints" => adjust(PointKind::Tile, -1, &args, "!removepoints <amount> <team>")?,
            "addbonuspoints" => {
                adjust(PointKind::Bonus, 1, &args, "!addbonuspoints <amount> <team>")?
            }
            "removebonuspoints" => {
                adjust(PointKind::Bonus, -1, &args, "!removebonuspoints <amount> <team>")?
            }
            "reset" => Command::Reset {
                team: rest_as_team(&args).ok_or(BingoError::Usage("!reset <team>"))?,
            },
            "finishevent" => Command::FinishEvent {
                team: rest_as_team(&args).ok_or(BingoError::Usage("!finishevent <team>"))?,
            },
            other => match other.strip_prefix("tile").and_then(|n| n.parse::<i64>().ok()) {
                Some(tile) => Command::Tile(tile),
                None => return Err(BingoError::UnknownCommand(other.to_string())),
            },
        };
        Ok(command)
    }

    /// Needs an allow-listed principal
    pub fn is_admin(&self) -> bool {
        !matches!(
            self,
            Command::Tile(_)
                | Command::StartBoard
                | Command::FinishBonus
                | Command::SkipBonus
                | Command::Progress
                | Command::Points
        )
    }

    /// Team named in the arguments (admin verbs), if any
    pub fn named_team(&self) -> Option<&str> {
        match self {
            Command::TileAll { team }
            | Command::SetBoard { team, .. }
            | Command::SetNextBoard { team }
            | Command::AdjustPoints { team, .. }
            | Command::Reset { team }
            | Command::FinishEvent { team } => Some(team),
            _ => None,
        }
    }
}

/// A parsed command bound to the team it acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub team: String,
    pub command: Command,
}

impl Invocation {
    /// Admin verbs act on the team they name, everything else on the channel's team
    pub fn resolve(channel: &str, text: &str) -> Result<Invocation, BingoError> {
        let command = Command::parse(text)?;
        let team = match command.named_team() {
            Some(team) => team.to_string(),
            None => team_key_from_channel(channel),
        };
        Ok(Invocation { team, command })
    }
}

fn parse_number(arg: Option<&&str>) -> Option<i64> {
    arg.and_then(|a| a.parse::<i64>().ok())
}

fn rest_as_team(args: &[&str]) -> Option<String> {
    if args.is_empty() {
        return None;
    }
    Some(normalize_team_name(&args.join(" ")))
}

fn adjust(
    kind: PointKind,
    sign: i64,
    args: &[&str],
    usage: &'static str,
) -> Result<Command, BingoError> {
    let amount = parse_number(args.first()).ok_or(BingoError::Usage(usage))?;
    let team = rest_as_team(args.get(1..).unwrap_or_default()).ok_or(BingoError::Usage(usage))?;
    Ok(Command::AdjustPoints {
        kind,
        delta: amount.saturating_mul(sign),
        team,
    })
}
