use crate::{TurnAction, TurnOutcome};
use thiserror::Error;

/// Backend-contract violation in a reported action list. Fatal to the
/// current computation: the view should reset and resync rather than guess.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum InconsistentTurnState {
    #[error("action {index} has sequence number {got}, expected {expected}")]
    NonMonotonicSequence {
        index: usize,
        expected: u32,
        got: u32,
    },
    #[error("action {0} is pending but is not the last action in the turn")]
    PendingNotLast(u32),
    #[error("action {action_number} rolled {got} dice (expected 1-{max})")]
    BadDiceCount {
        action_number: u32,
        got: usize,
        max: usize,
    },
    #[error("action {action_number}: score {score} inconsistent with {kept} kept dice")]
    ScoreKeptMismatch {
        action_number: u32,
        score: u32,
        kept: usize,
    },
    #[error("action {0}: kept dice are not a subset of the rolled dice")]
    KeptNotSubset(u32),
}

/// Actions the player may legally take, derived from the turn's action list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LegalAction {
    /// Roll a fresh set of dice (empty turn, or prior action resolved).
    StartTurn,
    /// End the turn, keeping the accumulated score.
    Bank,
    /// Keep scoring dice and roll the remainder.
    Continue,
    /// Acknowledge a farkle; forced, no alternative.
    Bust,
}

/// A validated view over the ordered action list of the active turn.
///
/// Construction fails fast on any malformed list; everything derived from a
/// constructed snapshot is pure, and reducing the same list twice yields
/// identical results.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnSnapshot<'a> {
    actions: &'a [TurnAction],
}

impl<'a> TurnSnapshot<'a> {
    /// Validate an action list reported by the backend.
    ///
    /// Checks sequence numbering (1..=n, no gaps), the single-pending-last
    /// rule, dice counts, the score/kept-dice farkle relation, and that
    /// kept dice are a sub-multiset of the roll.
    pub fn try_new(actions: &'a [TurnAction]) -> Result<Self, InconsistentTurnState> {
        for (index, action) in actions.iter().enumerate() {
            let expected = index as u32 + 1;
            if action.action_number != expected {
                return Err(InconsistentTurnState::NonMonotonicSequence {
                    index,
                    expected,
                    got: action.action_number,
                });
            }
            if action.is_pending() && index != actions.len() - 1 {
                return Err(InconsistentTurnState::PendingNotLast(action.action_number));
            }
            let rolled = action.dice_values.len();
            if rolled == 0 || rolled > crate::DICE_PER_TURN as usize {
                return Err(InconsistentTurnState::BadDiceCount {
                    action_number: action.action_number,
                    got: rolled,
                    max: crate::DICE_PER_TURN as usize,
                });
            }
            if (action.score == 0) != action.kept_dice.is_empty() {
                return Err(InconsistentTurnState::ScoreKeptMismatch {
                    action_number: action.action_number,
                    score: action.score,
                    kept: action.kept_dice.len(),
                });
            }
            if action.remaining_dice().len() != rolled - action.kept_dice.len() {
                return Err(InconsistentTurnState::KeptNotSubset(action.action_number));
            }
        }
        Ok(Self { actions })
    }

    /// The most recent action, or `None` on an empty turn.
    pub fn latest(&self) -> Option<&'a TurnAction> {
        self.actions.last()
    }

    /// Whether the pending action scored nothing. Always `false` when there
    /// is no pending action.
    pub fn is_farkle(&self) -> bool {
        matches!(self.latest(), Some(action) if action.is_pending() && action.is_farkle())
    }

    /// A fresh roll may begin: empty turn, or the prior action was resolved.
    pub fn can_start_turn(&self) -> bool {
        self.latest().map_or(true, |action| !action.is_pending())
    }

    /// A non-farkle pending action may keep dice and roll again.
    pub fn can_continue(&self) -> bool {
        matches!(self.latest(), Some(action) if action.is_pending() && !action.is_farkle())
    }

    /// Same precondition as [`Self::can_continue`].
    pub fn can_bank(&self) -> bool {
        self.can_continue()
    }

    /// Sum of scores across the turn so far (what a bank would award).
    pub fn turn_total(&self) -> u32 {
        self.actions.iter().map(|action| action.score).sum()
    }

    /// The exact set of legal actions: one of `{StartTurn}`, `{Bust}`, or
    /// `{Bank, Continue}`. The three are mutually exclusive.
    pub fn legal_actions(&self) -> &'static [LegalAction] {
        if self.can_start_turn() {
            &[LegalAction::StartTurn]
        } else if self.is_farkle() {
            &[LegalAction::Bust]
        } else {
            &[LegalAction::Bank, LegalAction::Continue]
        }
    }

    /// Outcome implied for the pending action by a legal action, if any.
    pub fn outcome_for(action: LegalAction) -> Option<TurnOutcome> {
        match action {
            LegalAction::StartTurn => None,
            LegalAction::Bank => Some(TurnOutcome::Bank),
            LegalAction::Continue => Some(TurnOutcome::Continue),
            LegalAction::Bust => Some(TurnOutcome::Bust),
        }
    }
}
