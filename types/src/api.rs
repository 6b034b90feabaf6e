use crate::{TurnAction, TurnOutcome};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Request body for `POST /roll`: start or continue a turn with a fresh
/// throw of `dice_count` dice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRequest {
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub dice_count: u8,
}

/// Request body for `POST /record`: resolve the pending action with the
/// player's decision. `kept_dice` is only consulted for `continue`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRequest {
    pub game_id: Uuid,
    pub player_id: Uuid,
    pub kept_dice: Vec<u8>,
    pub outcome: TurnOutcome,
}

/// Response for `GET /turn/{game_id}`: the full state of the active turn,
/// used on connect/reconnect before the realtime stream takes over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnStateResponse {
    pub game_id: Uuid,
    pub turn_number: u32,
    pub current_player_id: Uuid,
    pub actions: Vec<TurnAction>,
}

/// One message on the realtime updates stream for a game.
///
/// `Action` is sent both when a roll appends a new pending action and when
/// a record resolves it in place; consumers key on `action_number` and must
/// tolerate duplicate delivery.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TurnUpdate {
    Action {
        game_id: Uuid,
        turn_number: u32,
        action: TurnAction,
    },
    TurnClosed {
        game_id: Uuid,
        turn_number: u32,
        outcome: TurnOutcome,
        banked_score: u32,
        next_player_id: Uuid,
    },
}

impl TurnUpdate {
    pub fn game_id(&self) -> Uuid {
        match self {
            TurnUpdate::Action { game_id, .. } => *game_id,
            TurnUpdate::TurnClosed { game_id, .. } => *game_id,
        }
    }

    pub fn turn_number(&self) -> u32 {
        match self {
            TurnUpdate::Action { turn_number, .. } => *turn_number,
            TurnUpdate::TurnClosed { turn_number, .. } => *turn_number,
        }
    }
}

/// JSON body carried by non-2xx responses.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

/// Stable error codes for [`ErrorBody::code`].
pub mod error_codes {
    pub const NOT_YOUR_TURN: &str = "not_your_turn";
    pub const NO_PENDING_ACTION: &str = "no_pending_action";
    pub const ACTION_PENDING: &str = "action_pending";
    pub const BAD_DICE_COUNT: &str = "bad_dice_count";
    pub const BAD_OUTCOME: &str = "bad_outcome";
    pub const BAD_KEPT_DICE: &str = "bad_kept_dice";
    pub const NO_SCRIPTED_ROLL: &str = "no_scripted_roll";
    pub const UNKNOWN_GAME: &str = "unknown_game";
}
