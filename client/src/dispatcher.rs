use crate::{backend::TurnBackend, Error, Result};
use farkle_types::{
    DiceSelection, LegalAction, RecordRequest, RollRequest, TurnAction, TurnOutcome, TurnSnapshot,
    TurnStateResponse, TurnUpdate, DICE_PER_TURN,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

/// Action chosen by the player in the UI.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerAction {
    Roll,
    Continue,
    Bank,
    Bust,
}

impl PlayerAction {
    fn as_legal(self) -> LegalAction {
        match self {
            PlayerAction::Roll => LegalAction::StartTurn,
            PlayerAction::Continue => LegalAction::Continue,
            PlayerAction::Bank => LegalAction::Bank,
            PlayerAction::Bust => LegalAction::Bust,
        }
    }
}

/// Dispatch lifecycle. Tri-state so "never tried" and "last attempt failed"
/// stay distinguishable in the UI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DispatchStatus {
    #[default]
    Idle,
    InFlight,
    Failed,
}

#[derive(Debug)]
struct Inner {
    turn_number: u32,
    current_player_id: Option<Uuid>,
    actions: Vec<TurnAction>,
    selection: DiceSelection,
    status: DispatchStatus,
}

/// Translates derived legal actions into single-shot backend calls and
/// folds backend responses and realtime updates back into the turn state.
///
/// Clonable handle over shared state: UI code holds one clone per control,
/// the subscription pump holds another. At most one dispatch is in flight
/// at a time; overlapping calls are rejected without touching the network.
pub struct Dispatcher<B> {
    backend: Arc<B>,
    game_id: Uuid,
    player_id: Uuid,
    inner: Arc<Mutex<Inner>>,
}

impl<B> Clone for Dispatcher<B> {
    fn clone(&self) -> Self {
        Self {
            backend: self.backend.clone(),
            game_id: self.game_id,
            player_id: self.player_id,
            inner: self.inner.clone(),
        }
    }
}

enum Outbound {
    Roll(RollRequest),
    Record(RecordRequest),
}

impl<B: TurnBackend> Dispatcher<B> {
    pub fn new(backend: B, game_id: Uuid, player_id: Uuid) -> Self {
        Self {
            backend: Arc::new(backend),
            game_id,
            player_id,
            inner: Arc::new(Mutex::new(Inner {
                turn_number: 1,
                current_player_id: None,
                actions: Vec::new(),
                selection: DiceSelection::new(),
                status: DispatchStatus::default(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A poisoned lock only means another thread panicked mid-update;
        // the turn data itself is still structurally validated on read.
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn game_id(&self) -> Uuid {
        self.game_id
    }

    pub fn player_id(&self) -> Uuid {
        self.player_id
    }

    /// Replace local state with a full snapshot from `GET /turn`.
    pub fn sync(&self, state: TurnStateResponse) {
        let mut inner = self.lock();
        inner.turn_number = state.turn_number;
        inner.current_player_id = Some(state.current_player_id);
        inner.actions = state.actions;
        inner.selection.clear();
    }

    pub fn status(&self) -> DispatchStatus {
        self.lock().status
    }

    pub fn is_in_flight(&self) -> bool {
        self.status() == DispatchStatus::InFlight
    }

    pub fn turn_number(&self) -> u32 {
        self.lock().turn_number
    }

    /// Whether the local player owns the turn. Defense in depth only; the
    /// backend enforces ownership regardless. Unknown ownership (no update
    /// seen yet) is treated as owning.
    pub fn is_current_player_turn(&self) -> bool {
        self.lock()
            .current_player_id
            .map_or(true, |current| current == self.player_id)
    }

    /// The turn's action list as last reported.
    pub fn actions(&self) -> Vec<TurnAction> {
        self.lock().actions.clone()
    }

    /// Sum of scores across the turn so far.
    pub fn turn_total(&self) -> Result<u32> {
        let inner = self.lock();
        Ok(TurnSnapshot::try_new(&inner.actions)?.turn_total())
    }

    /// The exact set of legal actions for the current turn state.
    ///
    /// Fails with [`Error::InconsistentTurnState`] when the backend has
    /// reported a malformed list; the view should resync rather than guess.
    pub fn legal_actions(&self) -> Result<&'static [LegalAction]> {
        let inner = self.lock();
        Ok(TurnSnapshot::try_new(&inner.actions)?.legal_actions())
    }

    /// Currently selected dice indices into the pending action's roll.
    pub fn selection(&self) -> BTreeSet<usize> {
        self.lock().selection.indices().clone()
    }

    /// Toggle a die in the tentative keep-selection. Silent no-op out of
    /// bounds, on a resolved action, or on an empty turn.
    pub fn toggle_selection(&self, index: usize) {
        let mut inner = self.lock();
        let Some(latest) = inner.actions.last().cloned() else {
            return;
        };
        inner.selection.toggle(index, &latest);
    }

    /// Dispatch a player action as exactly one backend call.
    ///
    /// Rejects locally (no network traffic) when a dispatch is already in
    /// flight, when the player does not own the turn, when the action is
    /// not in the current legal set, or when a continue has no dice
    /// selected. On backend failure the turn state is unchanged and the
    /// status moves to [`DispatchStatus::Failed`]; retrying is up to the
    /// user.
    pub async fn dispatch(&self, action: PlayerAction) -> Result<()> {
        let outbound = self.prepare(action)?;

        let result = match outbound {
            Outbound::Roll(request) => self.backend.roll(request).await,
            Outbound::Record(request) => self.backend.record(request).await,
        };

        let mut inner = self.lock();
        match result {
            Ok(returned) => {
                Self::merge_action(&mut inner, returned);
                inner.selection.clear();
                inner.status = DispatchStatus::Idle;
                Ok(())
            }
            Err(err) => {
                inner.status = DispatchStatus::Failed;
                Err(err)
            }
        }
    }

    /// Validate the action and build the outbound request, marking the
    /// dispatcher in flight. Holds the lock only for the duration of the
    /// checks, never across the network call.
    fn prepare(&self, action: PlayerAction) -> Result<Outbound> {
        let mut inner = self.lock();
        if inner.status == DispatchStatus::InFlight {
            return Err(Error::DispatchInFlight);
        }
        if let Some(current) = inner.current_player_id {
            if current != self.player_id {
                return Err(Error::NotYourTurn);
            }
        }

        let snapshot = TurnSnapshot::try_new(&inner.actions)?;
        if !snapshot.legal_actions().contains(&action.as_legal()) {
            warn!(?action, "dispatch of illegal action ignored");
            return Err(Error::IllegalAction(action));
        }

        let outbound = match action {
            PlayerAction::Roll => Outbound::Roll(RollRequest {
                game_id: self.game_id,
                player_id: self.player_id,
                dice_count: snapshot
                    .latest()
                    .map_or(DICE_PER_TURN, TurnAction::next_roll_dice),
            }),
            PlayerAction::Continue => {
                // Legality implies a pending action exists.
                let Some(latest) = snapshot.latest() else {
                    return Err(Error::IllegalAction(action));
                };
                let kept_dice = inner.selection.selected_values(latest);
                if kept_dice.is_empty() {
                    return Err(Error::EmptySelection);
                }
                Outbound::Record(RecordRequest {
                    game_id: self.game_id,
                    player_id: self.player_id,
                    kept_dice,
                    outcome: TurnOutcome::Continue,
                })
            }
            PlayerAction::Bank => Outbound::Record(RecordRequest {
                game_id: self.game_id,
                player_id: self.player_id,
                kept_dice: Vec::new(),
                outcome: TurnOutcome::Bank,
            }),
            PlayerAction::Bust => Outbound::Record(RecordRequest {
                game_id: self.game_id,
                player_id: self.player_id,
                kept_dice: Vec::new(),
                outcome: TurnOutcome::Bust,
            }),
        };

        inner.status = DispatchStatus::InFlight;
        Ok(outbound)
    }

    /// Fold a realtime update into local state. Idempotent: duplicate
    /// delivery of an action or of a terminal turn close is a no-op, and
    /// stale updates for earlier turns are ignored.
    pub fn apply_update(&self, update: TurnUpdate) {
        if update.game_id() != self.game_id {
            return;
        }
        let mut inner = self.lock();
        match update {
            TurnUpdate::Action {
                turn_number,
                action,
                ..
            } => {
                if turn_number < inner.turn_number {
                    debug!(turn_number, "ignoring update for an earlier turn");
                    return;
                }
                if turn_number > inner.turn_number {
                    // The turn pointer advanced externally; start fresh.
                    inner.turn_number = turn_number;
                    inner.actions.clear();
                    inner.selection.clear();
                }
                if Self::merge_action(&mut inner, action) {
                    inner.selection.clear();
                }
            }
            TurnUpdate::TurnClosed {
                turn_number,
                next_player_id,
                ..
            } => {
                if turn_number < inner.turn_number {
                    return;
                }
                inner.turn_number = turn_number + 1;
                inner.current_player_id = Some(next_player_id);
                inner.actions.clear();
                inner.selection.clear();
            }
        }
    }

    /// Merge one action by sequence position: replace a known action in
    /// place (e.g. the pending action resolving) or append the next one.
    /// Returns whether a new action was appended.
    fn merge_action(inner: &mut Inner, action: TurnAction) -> bool {
        let index = action.action_number.saturating_sub(1) as usize;
        if index < inner.actions.len() {
            inner.actions[index] = action;
            false
        } else if index == inner.actions.len() {
            inner.actions.push(action);
            true
        } else {
            // A gap means missed updates; keep state as-is and let the
            // caller resync via the turn state endpoint.
            warn!(
                action_number = action.action_number,
                have = inner.actions.len(),
                "out-of-order action dropped"
            );
            false
        }
    }
}
