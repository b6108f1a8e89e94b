// Snapshot restore: rebuild typed state from whatever JSON is on disk.
// Files written by older builds may lack fields; those fall back to defaults
// instead of failing the whole load.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::snapshot::Snapshot;
use crate::{is_valid_tile, BingoError, QuipMemory, Rotation, TeamState, TileSet};

/// Legacy spelling of the global quip key
const LEGACY_GLOBAL_QUIPS_KEY: &str = "GLOBAL_USED_QUIPS";

/// Parse a snapshot document. Only a missing/non-object root or `game_state`
/// is fatal; everything below that is backfilled.
pub(crate) fn parse_snapshot(data: &Value) -> Result<Snapshot, BingoError> {
    let root = data
        .as_object()
        .ok_or_else(|| BingoError::Persistence("Expected JSON object at snapshot root".into()))?;

    let teams = root
        .get("game_state")
        .and_then(|v| v.as_object())
        .ok_or_else(|| BingoError::Persistence("Missing or invalid game_state".into()))?;

    let game_state = teams
        .iter()
        .map(|(team, record)| (team.clone(), parse_team_record(team, record)))
        .collect();

    let global_used_quips = root
        .get("global_used_quips")
        .or_else(|| root.get(LEGACY_GLOBAL_QUIPS_KEY))
        .map(parse_quip_memory)
        .unwrap_or_default();

    let team_sequences = root
        .get("team_sequences")
        .and_then(|v| v.as_object())
        .map(|seqs| {
            seqs.iter()
                .filter_map(|(team, order)| {
                    serde_json::from_value::<Rotation>(order.clone())
                        .ok()
                        .map(|rotation| (team.clone(), rotation))
                })
                .collect()
        })
        .unwrap_or_default();

    Ok(Snapshot {
        game_state,
        global_used_quips,
        team_sequences,
        revision: root.get("revision").and_then(|v| v.as_u64()).unwrap_or(0),
        saved_at: root
            .get("saved_at")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

/// One team record; anything missing or mistyped takes its default
fn parse_team_record(team: &str, record: &Value) -> TeamState {
    if !record.is_object() {
        log::warn!("[RESTORE] team:{} record is not an object, using defaults", team);
        return TeamState::default();
    }

    TeamState {
        board_index: record
            .get("board_index")
            .and_then(|v| v.as_u64())
            .unwrap_or(0) as usize,
        completed_tiles: record
            .get("completed_tiles")
            .map(|v| parse_tiles(team, v))
            .unwrap_or_default(),
        bonus_active: parse_flag(record, "bonus_active"),
        points: parse_count(record, "points"),
        bonus_points: parse_count(record, "bonus_points"),
        started: parse_flag(record, "started"),
        looped: parse_flag(record, "looped"),
        finished: parse_flag(record, "finished"),
        used_quips: record
            .get("used_quips")
            .map(parse_quip_memory)
            .unwrap_or_default(),
    }
}

fn parse_flag(record: &Value, field: &str) -> bool {
    record.get(field).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Non-negative counter; negatives floor at 0
fn parse_count(record: &Value, field: &str) -> u32 {
    match record.get(field) {
        Some(v) => v
            .as_i64()
            .map(|n| n.clamp(0, u32::MAX as i64) as u32)
            .unwrap_or(0),
        None => 0,
    }
}

/// Numbers or numeric strings in [1,9]; duplicates collapse
fn parse_tiles(team: &str, value: &Value) -> TileSet {
    let Some(items) = value.as_array() else {
        log::warn!("[RESTORE] team:{} completed_tiles is not a list", team);
        return TileSet::new();
    };

    let tiles: TileSet = items
        .iter()
        .filter_map(|item| {
            item.as_i64()
                .or_else(|| item.as_str().and_then(|s| s.trim().parse::<i64>().ok()))
        })
        .filter(|tile| is_valid_tile(*tile))
        .map(|tile| tile as u8)
        .collect();

    if tiles.len() != items.len() {
        log::warn!(
            "[RESTORE] team:{} completed_tiles normalized {} -> {}",
            team,
            items.len(),
            tiles.len()
        );
    }
    tiles
}

/// `{category: [quip, ...]}`; non-string entries dropped
fn parse_quip_memory(value: &Value) -> QuipMemory {
    let Some(categories) = value.as_object() else {
        return BTreeMap::new();
    };
    categories
        .iter()
        .map(|(category, quips)| {
            let used: BTreeSet<String> = quips
                .as_array()
                .map(|list| {
                    list.iter()
                        .filter_map(|q| q.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default();
            (category.clone(), used)
        })
        .collect()
}

/// Bring a loaded record back inside the invariants for its rotation
pub(crate) fn repair_team(team: &str, state: &mut TeamState, rotation: &Rotation) {
    if state.board_index >= rotation.len() {
        log::warn!(
            "[RESTORE] team:{} board_index:{} outside rotation, reset to 0",
            team,
            state.board_index
        );
        state.board_index = 0;
    }
    if state.bonus_active && (!state.board_full() || state.looped) {
        log::warn!(
            "[RESTORE] team:{} bonus_active cleared (tiles:{} looped:{})",
            team,
            state.completed_tiles.len(),
            state.looped
        );
        state.bonus_active = false;
    }
}
