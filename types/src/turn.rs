use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of dice in play at the start of a turn.
pub const DICE_PER_TURN: u8 = 6;

/// How a resolved turn action ended. A pending action (the roll the player
/// is still deciding on) carries no outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnOutcome {
    /// Turn ended voluntarily, accumulated score kept.
    Bank,
    /// Forced turn end on a farkle, score forfeited.
    Bust,
    /// Player kept scoring dice and rolled again.
    Continue,
}

/// One resolved dice roll within a turn, as reported by the backend.
///
/// The backend is the trust boundary: `kept_dice` and `score` are whatever
/// the external scoring engine decided, and the client never second-guesses
/// them beyond structural consistency checks.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnAction {
    pub id: Uuid,
    /// 1-based sequence position within the current turn.
    pub action_number: u32,
    /// Face values of all dice rolled in this action (length 1-6).
    pub dice_values: Vec<u8>,
    /// The scoring subset of `dice_values`. Empty means farkle.
    pub kept_dice: Vec<u8>,
    /// Points awarded for this roll. Zero exactly when `kept_dice` is empty.
    pub score: u32,
    /// Dice remaining to roll if the turn continues. Zero means all six
    /// are back in play ("hot dice").
    pub available_dice: u8,
    /// Set once a bank/bust/continue is recorded; `None` while pending.
    pub turn_action_outcome: Option<TurnOutcome>,
}

impl TurnAction {
    /// Whether this action is still awaiting the player's decision.
    pub fn is_pending(&self) -> bool {
        self.turn_action_outcome.is_none()
    }

    /// A roll that scored nothing. Only meaningful on the pending action.
    pub fn is_farkle(&self) -> bool {
        self.score == 0
    }

    /// The multiset of `dice_values` not present in `kept_dice`.
    ///
    /// Removal respects duplicate counts: `[2,2,5]` minus kept `[5]` is
    /// `[2,2]`, and `[2,2,5]` minus kept `[2]` is `[2,5]`.
    pub fn remaining_dice(&self) -> Vec<u8> {
        let mut kept = [0u8; 7];
        for &face in &self.kept_dice {
            if let Some(count) = kept.get_mut(face as usize) {
                *count += 1;
            }
        }
        self.dice_values
            .iter()
            .copied()
            .filter(|&face| match kept.get_mut(face as usize) {
                Some(count) if *count > 0 => {
                    *count -= 1;
                    false
                }
                _ => true,
            })
            .collect()
    }

    /// Dice count a follow-up roll must use, mapping 0 ("hot dice") back
    /// to a full set of six.
    pub fn next_roll_dice(&self) -> u8 {
        if self.available_dice == 0 {
            DICE_PER_TURN
        } else {
            self.available_dice
        }
    }
}
