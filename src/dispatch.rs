//! Chat-facing glue: parse a command, run it on the service, and send the
//! resulting messages in a fixed order.
//!
//! Order per reply: headline, quip, scoreboard, board image, checklist, bonus block.

use std::sync::Arc;

use async_trait::async_trait;

use crate::boards;
use crate::commands::{team_display, Command, Invocation, PREFIX};
use crate::quips::{self, QuipScope};
use crate::tracker::{BonusResolution, Outcome, PointKind, Standing};
use crate::{BingoError, BingoService, BoardLetter, TileSet, Totals};

/// Draws a board with its completed tiles marked
pub trait BoardRenderer: Send + Sync {
    fn render_board(&self, letter: BoardLetter, completed: &TileSet) -> Result<Vec<u8>, String>;
}

/// Delivers messages to a channel
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, channel: &str, message: Message) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Text(String),
    Image { filename: String, bytes: Vec<u8> },
}

impl Message {
    pub fn text(&self) -> Option<&str> {
        match self {
            Message::Text(text) => Some(text),
            Message::Image { .. } => None,
        }
    }
}

type Pool = &'static [&'static str];

/// Everything a reply may contain, before quips are picked and boards drawn
#[derive(Debug, Default)]
struct Reply {
    headline: Option<String>,
    quip: Option<(&'static str, Pool)>,
    totals: Option<Totals>,
    board: Option<(BoardLetter, TileSet)>,
    bonus: Option<BoardLetter>,
}

impl Reply {
    fn headline(text: impl Into<String>) -> Self {
        Reply {
            headline: Some(text.into()),
            ..Reply::default()
        }
    }
}

pub struct Dispatcher<R, S> {
    service: Arc<BingoService>,
    renderer: R,
    sink: S,
}

impl<R: BoardRenderer, S: MessageSink> Dispatcher<R, S> {
    pub fn new(service: Arc<BingoService>, renderer: R, sink: S) -> Self {
        Self {
            service,
            renderer,
            sink,
        }
    }

    pub fn service(&self) -> &BingoService {
        &self.service
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Respond to one chat line and deliver the reply. Returns messages delivered.
    pub async fn handle(&self, channel: &str, principal: u64, text: &str) -> usize {
        let mut delivered = 0;
        for message in self.respond(channel, principal, text).await {
            match self.sink.send(channel, message).await {
                Ok(()) => delivered += 1,
                Err(e) => log::warn!("[DISPATCH] send failed channel:{} error:{}", channel, e),
            }
        }
        delivered
    }

    /// Build the reply without sending it. Lines without the prefix get nothing.
    pub async fn respond(&self, channel: &str, principal: u64, text: &str) -> Vec<Message> {
        if !text.trim_start().starts_with(PREFIX) {
            return Vec::new();
        }

        let invocation = match Invocation::resolve(channel, text) {
            Ok(invocation) => invocation,
            Err(e) => return vec![Message::Text(e.to_string())],
        };
        if invocation.command.is_admin() && !self.service.config().is_admin(principal) {
            log::warn!(
                "[DISPATCH] unauthorized principal:{} command:{:?}",
                principal,
                invocation.command
            );
            return vec![Message::Text(BingoError::Unauthorized.to_string())];
        }

        log::debug!(
            "[DISPATCH] channel:{} team:{} command:{:?}",
            channel,
            invocation.team,
            invocation.command
        );
        match self.execute(&invocation).await {
            Ok(Some((reply, scope))) => self.assemble(reply, scope).await,
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("[DISPATCH] rejected team:{} error:{:?}", invocation.team, e);
                vec![Message::Text(e.to_string())]
            }
        }
    }

    // ==================== EXECUTION ====================

    async fn execute<'a>(
        &self,
        invocation: &'a Invocation,
    ) -> Result<Option<(Reply, QuipScope<'a>)>, BingoError> {
        let team = invocation.team.as_str();
        let name = team_display(team);
        let svc = &self.service;
        let scope = QuipScope::Team(team);

        let outcome = match &invocation.command {
            Command::StartBoard => svc.start_board(team).await?,
            Command::Tile(tile) => svc.complete_tile(team, *tile).await?,
            Command::RemoveTile(tile) => svc.remove_tile(team, *tile).await?,
            Command::FinishBonus => svc.resolve_bonus(team, BonusResolution::Completed).await?,
            Command::SkipBonus => svc.resolve_bonus(team, BonusResolution::Skipped).await?,
            Command::TileAll { .. } => svc.tile_all(team).await?,
            Command::SetBoard { letter, .. } => svc.set_board(team, *letter).await?,
            Command::SetNextBoard { .. } => svc.advance_board(team).await?,
            Command::AdjustPoints { kind, delta, .. } => {
                svc.adjust_points(team, *delta, *kind).await?
            }
            Command::Reset { .. } => svc.reset_team(team).await?,
            Command::FinishEvent { .. } => svc.finish_team(team).await?,
            Command::ResetAll => match svc.reset_all().await {
                Outcome::ResetAllIgnored => return Ok(None),
                outcome => return Ok(Some((describe(team, &outcome), QuipScope::Global))),
            },

            Command::Progress => {
                let view = svc.progress(team).await?;
                let mut headline = format!("📋 **{} is on Board {}**", name, view.board);
                if view.looped {
                    headline.push_str(" (second lap, no Bonus Tiles)");
                }
                let reply = Reply {
                    headline: Some(headline),
                    quip: Some((quips::PROGRESS, quips::PROGRESS_POOL)),
                    totals: Some(view.totals),
                    board: Some((view.board, view.completed.clone())),
                    bonus: view.bonus_active.then_some(view.board),
                };
                return Ok(Some((reply, scope)));
            }
            Command::Points => {
                let totals = svc.points(team).await?;
                let reply = Reply {
                    headline: Some(format!("📊 **{} points**", name)),
                    quip: Some((quips::POINTS, quips::POINTS_POOL)),
                    totals: Some(totals),
                    ..Reply::default()
                };
                return Ok(Some((reply, scope)));
            }
            Command::PointsAllTeams => {
                let reply = Reply::headline(standings_table(&svc.standings().await));
                return Ok(Some((reply, QuipScope::Global)));
            }
        };

        Ok(Some((describe(team, &outcome), scope)))
    }

    // ==================== ASSEMBLY ====================

    async fn assemble(&self, reply: Reply, scope: QuipScope<'_>) -> Vec<Message> {
        let name = match scope {
            QuipScope::Team(team) => team_display(team),
            QuipScope::Global => String::new(),
        };
        let letter = reply
            .board
            .as_ref()
            .map(|(letter, _)| letter.to_string())
            .unwrap_or_default();

        let mut messages = Vec::new();
        if let Some(headline) = reply.headline {
            messages.push(Message::Text(headline));
        }
        if let Some((category, pool)) = reply.quip {
            if let Some(quip) = self.service.quip(scope, category, pool).await {
                messages.push(Message::Text(quips::fill(quip, &name, &letter)));
            }
        }
        if let Some(totals) = reply.totals {
            messages.push(Message::Text(totals.to_string()));
        }
        if let Some((board, completed)) = reply.board {
            match self.renderer.render_board(board, &completed) {
                Ok(bytes) => messages.push(Message::Image {
                    filename: format!("board_{}.png", board),
                    bytes,
                }),
                Err(e) => log::warn!("[DISPATCH] render failed board:{} error:{}", board, e),
            }
            messages.push(Message::Text(format!(
                "**Board {} checklist**\n{}",
                board,
                boards::checklist(board, &completed)
            )));
        }
        if let Some(board) = reply.bonus {
            messages.push(Message::Text(format!(
                "🌟 **Bonus Tile for Board {}**\n{}",
                board,
                boards::bonus_block(board)
            )));
        }
        messages
    }
}

/// Headline, quip category and attachments for a tracker outcome
fn describe(team: &str, outcome: &Outcome) -> Reply {
    let team = team_display(team);
    let mut reply = match outcome {
        Outcome::BoardStarted { board, .. } => Reply {
            headline: Some(format!("🎲 **{} has started Board {}!**", team, board)),
            quip: Some((quips::START_BOARD, quips::START_BOARD_POOL)),
            ..Reply::default()
        },
        Outcome::AlreadyStarted { board, .. } => Reply::headline(format!(
            "Your team has already started! You're on Board {}.",
            board
        )),
        Outcome::TileCompleted { tile, board, .. } => Reply {
            headline: Some(format!("✅ Tile {} completed on Board {}!", tile, board)),
            quip: Some((quips::TILE_COMPLETE, quips::TILE_COMPLETE_POOL)),
            ..Reply::default()
        },
        Outcome::TileAlreadyCompleted { tile, board, .. } => Reply::headline(format!(
            "Tile {} is already completed on Board {}.",
            tile, board
        )),
        Outcome::BonusUnlocked { board, .. } => Reply {
            headline: Some(format!(
                "🎉 **Board {} complete!** Finish the Bonus Tile with `!finishbonus` or pass with `!skipbonus`.",
                board
            )),
            quip: Some((quips::BONUS_REVEAL, quips::BONUS_REVEAL_POOL)),
            bonus: Some(*board),
            ..Reply::default()
        },
        Outcome::BoardLooped {
            completed_board,
            board,
            ..
        } => Reply {
            headline: Some(format!(
                "🔁 Board {} complete! Moving on to Board {}.",
                completed_board, board
            )),
            quip: Some((quips::LOOP_ADVANCE, quips::LOOP_ADVANCE_POOL)),
            ..Reply::default()
        },
        Outcome::TileRemoved {
            tile,
            board,
            bonus_cleared,
            ..
        } => {
            let mut headline = format!("❌ Tile {} removed from Board {}.", tile, board);
            if *bonus_cleared {
                headline.push_str(" The Bonus Tile is locked again.");
            }
            Reply {
                headline: Some(headline),
                quip: Some((quips::TILE_REMOVE, quips::TILE_REMOVE_POOL)),
                ..Reply::default()
            }
        }
        Outcome::TileNotCompleted { tile, board, .. } => Reply::headline(format!(
            "Tile {} is not completed on Board {}.",
            tile, board
        )),
        Outcome::BonusResolved {
            resolution,
            completed_board,
            board,
            wrapped,
            ..
        } => {
            let (verb, quip) = match resolution {
                BonusResolution::Completed => (
                    "completed",
                    (quips::BONUS_COMPLETE, quips::BONUS_COMPLETE_POOL),
                ),
                BonusResolution::Skipped => {
                    ("skipped", (quips::BONUS_SKIP, quips::BONUS_SKIP_POOL))
                }
            };
            let mut headline = format!(
                "🏆 Bonus Tile for Board {} {}! Moving on to Board {}.",
                completed_board, verb, board
            );
            if *wrapped {
                headline.push_str("\n🔁 That was the last board. Back to the start, and no more Bonus Tiles.");
            }
            Reply {
                headline: Some(headline),
                quip: Some(quip),
                ..Reply::default()
            }
        }
        Outcome::PointsAdjusted { kind, delta, .. } => {
            let verb = if *delta < 0 { "Removed" } else { "Added" };
            let counter = match kind {
                PointKind::Tile => "points",
                PointKind::Bonus => "bonus points",
            };
            Reply::headline(format!(
                "⚙️ {} {} {} for {}.",
                verb,
                delta.unsigned_abs(),
                counter,
                team
            ))
        }
        Outcome::BoardSet { board, .. } => {
            Reply::headline(format!("⚙️ {} moved to Board {}.", team, board))
        }
        Outcome::NoMoreBoards { board } => Reply::headline(format!(
            "{} is already on the last board in its rotation (Board {}).",
            team, board
        )),
        Outcome::TeamReset => Reply::headline(format!("⚙️ {} has been reset.", team)),
        Outcome::AllReset { .. } => Reply {
            quip: Some((quips::RESET_ALL, quips::RESET_ALL_POOL)),
            ..Reply::default()
        },
        Outcome::ResetAllIgnored => Reply::default(),
        Outcome::TeamFinished { .. } => Reply::headline(format!(
            "🏁 **{} has completed Bingo Roulette!** Final tally below.",
            team
        )),
    };

    reply.totals = outcome.totals();
    reply.board = outcome.render_request();
    reply
}

fn standings_table(rows: &[Standing]) -> String {
    let mut table = String::from("📊 **Standings**");
    for (rank, row) in rows.iter().enumerate() {
        table.push_str(&format!(
            "\n{}. **{}**: Points {} | Bonus Points {} | Total {}",
            rank + 1,
            team_display(&row.team),
            row.totals.points,
            row.totals.bonus_points,
            row.totals.total()
        ));
    }
    table
}
