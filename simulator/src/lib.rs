use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State as AxumState,
    },
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use farkle_types::{
    error_codes, ErrorBody, RecordRequest, RollRequest, TurnAction, TurnOutcome,
    TurnStateResponse, TurnUpdate, DICE_PER_TURN,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, error, warn};
use uuid::Uuid;

const UPDATE_CHANNEL_CAPACITY: usize = 1024;

/// One pre-scripted roll outcome.
///
/// The real scoring engine is an external service; the simulator never
/// invents scores. Tests (or an operator) enqueue the dice values together
/// with the scoring verdict the "engine" is supposed to have produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptedRoll {
    pub dice_values: Vec<u8>,
    pub kept_dice: Vec<u8>,
    pub score: u32,
}

impl ScriptedRoll {
    /// A roll with no scoring dice.
    pub fn farkle(dice_values: Vec<u8>) -> Self {
        Self {
            dice_values,
            kept_dice: Vec::new(),
            score: 0,
        }
    }
}

/// A request the simulator refused, mapped onto an HTTP status and a
/// structured error body.
#[derive(Clone, Debug)]
pub struct Rejection {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

impl Rejection {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody {
                code: self.code.to_string(),
                message: self.message,
            }),
        )
            .into_response()
    }
}

struct Game {
    players: Vec<Uuid>,
    current: usize,
    turn_number: u32,
    actions: Vec<TurnAction>,
    script: VecDeque<ScriptedRoll>,
}

impl Game {
    fn current_player(&self) -> Uuid {
        self.players[self.current]
    }
}

#[derive(Default)]
struct State {
    games: HashMap<Uuid, Game>,
}

/// In-memory farkle backend. Enforces the turn protocol (ownership, the
/// single-pending-action rule, dice-count bookkeeping, outcome
/// consistency) and replays scripted rolls; it deliberately contains no
/// scoring rules of its own.
#[derive(Clone)]
pub struct Simulator {
    state: Arc<RwLock<State>>,
    update_tx: broadcast::Sender<TurnUpdate>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        let (update_tx, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(State::default())),
            update_tx,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, State> {
        match self.state.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, State> {
        match self.state.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Create a game with the given seating order; the first player owns
    /// the first turn. Returns the new game id.
    pub fn create_game(&self, mut players: Vec<Uuid>) -> Uuid {
        if players.is_empty() {
            players.push(Uuid::new_v4());
        }
        let game_id = Uuid::new_v4();
        self.write().games.insert(
            game_id,
            Game {
                players,
                current: 0,
                turn_number: 1,
                actions: Vec::new(),
                script: VecDeque::new(),
            },
        );
        game_id
    }

    /// Enqueue the outcome the next roll in this game will produce.
    pub fn script_roll(&self, game_id: Uuid, roll: ScriptedRoll) {
        let mut state = self.write();
        match state.games.get_mut(&game_id) {
            Some(game) => game.script.push_back(roll),
            None => warn!(%game_id, "script_roll for unknown game ignored"),
        }
    }

    /// Subscribe to the update fan-out (all games; callers filter).
    pub fn subscribe(&self) -> broadcast::Receiver<TurnUpdate> {
        self.update_tx.subscribe()
    }

    fn publish(&self, update: TurnUpdate) {
        if self.update_tx.send(update).is_err() {
            debug!("no update subscribers");
        }
    }

    /// Current turn state of a game.
    pub fn turn_state(&self, game_id: Uuid) -> Result<TurnStateResponse, Rejection> {
        let state = self.read();
        let game = state.games.get(&game_id).ok_or_else(|| {
            Rejection::new(StatusCode::NOT_FOUND, error_codes::UNKNOWN_GAME, "unknown game")
        })?;
        Ok(TurnStateResponse {
            game_id,
            turn_number: game.turn_number,
            current_player_id: game.current_player(),
            actions: game.actions.clone(),
        })
    }

    /// Serve a roll: append the next scripted action as pending.
    pub fn roll(&self, request: RollRequest) -> Result<TurnAction, Rejection> {
        let mut state = self.write();
        let game = state.games.get_mut(&request.game_id).ok_or_else(|| {
            Rejection::new(StatusCode::NOT_FOUND, error_codes::UNKNOWN_GAME, "unknown game")
        })?;
        if game.current_player() != request.player_id {
            return Err(Rejection::new(
                StatusCode::FORBIDDEN,
                error_codes::NOT_YOUR_TURN,
                "it is not this player's turn",
            ));
        }
        if game.actions.last().is_some_and(TurnAction::is_pending) {
            return Err(Rejection::new(
                StatusCode::CONFLICT,
                error_codes::ACTION_PENDING,
                "the previous action is still awaiting a decision",
            ));
        }
        let expected = game
            .actions
            .last()
            .map_or(DICE_PER_TURN, TurnAction::next_roll_dice);
        if request.dice_count != expected {
            return Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                error_codes::BAD_DICE_COUNT,
                format!("expected a roll of {expected} dice, got {}", request.dice_count),
            ));
        }
        let Some(script) = game.script.pop_front() else {
            return Err(Rejection::new(
                StatusCode::CONFLICT,
                error_codes::NO_SCRIPTED_ROLL,
                "no scripted roll queued for this game",
            ));
        };

        let available_dice = script
            .dice_values
            .len()
            .saturating_sub(script.kept_dice.len()) as u8;
        let action = TurnAction {
            id: Uuid::new_v4(),
            action_number: game.actions.len() as u32 + 1,
            dice_values: script.dice_values,
            kept_dice: script.kept_dice,
            score: script.score,
            available_dice,
            turn_action_outcome: None,
        };
        game.actions.push(action.clone());
        let update = TurnUpdate::Action {
            game_id: request.game_id,
            turn_number: game.turn_number,
            action: action.clone(),
        };
        drop(state);

        self.publish(update);
        Ok(action)
    }

    /// Resolve the pending action with the player's decision; a bank or
    /// bust closes the turn and passes it to the next seated player.
    pub fn record(&self, request: RecordRequest) -> Result<TurnAction, Rejection> {
        let mut state = self.write();
        let game = state.games.get_mut(&request.game_id).ok_or_else(|| {
            Rejection::new(StatusCode::NOT_FOUND, error_codes::UNKNOWN_GAME, "unknown game")
        })?;
        if game.current_player() != request.player_id {
            return Err(Rejection::new(
                StatusCode::FORBIDDEN,
                error_codes::NOT_YOUR_TURN,
                "it is not this player's turn",
            ));
        }
        let turn_number = game.turn_number;
        let Some(pending) = game.actions.last_mut().filter(|action| action.is_pending()) else {
            return Err(Rejection::new(
                StatusCode::CONFLICT,
                error_codes::NO_PENDING_ACTION,
                "no pending action to resolve",
            ));
        };

        // A farkle can only bust; a scoring roll can never bust.
        if (request.outcome == TurnOutcome::Bust) != pending.is_farkle() {
            return Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                error_codes::BAD_OUTCOME,
                format!("{:?} is not a valid outcome for this roll", request.outcome),
            ));
        }
        if request.outcome == TurnOutcome::Continue
            && (request.kept_dice.is_empty()
                || !is_sub_multiset(&request.kept_dice, &pending.kept_dice))
        {
            return Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                error_codes::BAD_KEPT_DICE,
                "kept dice must be a non-empty subset of the scoring dice",
            ));
        }

        pending.turn_action_outcome = Some(request.outcome);
        let resolved = pending.clone();
        let mut updates = vec![TurnUpdate::Action {
            game_id: request.game_id,
            turn_number,
            action: resolved.clone(),
        }];

        if matches!(request.outcome, TurnOutcome::Bank | TurnOutcome::Bust) {
            let banked_score = match request.outcome {
                TurnOutcome::Bank => game.actions.iter().map(|action| action.score).sum(),
                _ => 0,
            };
            game.turn_number += 1;
            game.current = (game.current + 1) % game.players.len();
            game.actions.clear();
            updates.push(TurnUpdate::TurnClosed {
                game_id: request.game_id,
                turn_number,
                outcome: request.outcome,
                banked_score,
                next_player_id: game.current_player(),
            });
        }
        drop(state);

        for update in updates {
            self.publish(update);
        }
        Ok(resolved)
    }
}

/// Multiset containment: every face in `sub` is available in `superset`
/// with at least the same multiplicity.
fn is_sub_multiset(sub: &[u8], superset: &[u8]) -> bool {
    let mut counts = [0i32; 7];
    for &face in superset {
        if let Some(count) = counts.get_mut(face as usize) {
            *count += 1;
        }
    }
    for &face in sub {
        match counts.get_mut(face as usize) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return false,
        }
    }
    true
}

/// HTTP/WebSocket surface over a [`Simulator`].
pub struct Api {
    simulator: Arc<Simulator>,
}

impl Api {
    pub fn new(simulator: Arc<Simulator>) -> Self {
        Self { simulator }
    }

    pub fn router(&self) -> Router {
        // Configure CORS
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE]);

        Router::new()
            .route("/roll", post(roll))
            .route("/record", post(record))
            .route("/turn/:game_id", get(turn_state))
            .route("/updates/:game_id", get(updates_ws))
            .layer(cors)
            .with_state(self.simulator.clone())
    }
}

async fn roll(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Json(request): Json<RollRequest>,
) -> Response {
    match simulator.roll(request) {
        Ok(action) => Json(action).into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

async fn record(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Json(request): Json<RecordRequest>,
) -> Response {
    match simulator.record(request) {
        Ok(action) => Json(action).into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

async fn turn_state(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Path(game_id): Path<Uuid>,
) -> Response {
    match simulator.turn_state(game_id) {
        Ok(state) => Json(state).into_response(),
        Err(rejection) => rejection.into_response(),
    }
}

async fn updates_ws(
    AxumState(simulator): AxumState<Arc<Simulator>>,
    Path(game_id): Path<Uuid>,
    ws: WebSocketUpgrade,
) -> Response {
    let receiver = simulator.subscribe();
    ws.on_upgrade(move |socket| stream_updates(socket, receiver, game_id))
}

async fn stream_updates(
    mut socket: WebSocket,
    mut receiver: broadcast::Receiver<TurnUpdate>,
    game_id: Uuid,
) {
    loop {
        match receiver.recv().await {
            Ok(update) => {
                if update.game_id() != game_id {
                    continue;
                }
                let payload = match serde_json::to_string(&update) {
                    Ok(payload) => payload,
                    Err(e) => {
                        error!("Failed to encode update: {}", e);
                        continue;
                    }
                };
                if socket.send(Message::Text(payload)).await.is_err() {
                    break; // Client went away
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "updates subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_player_game(simulator: &Simulator) -> (Uuid, Uuid, Uuid) {
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let game_id = simulator.create_game(vec![alice, bob]);
        (game_id, alice, bob)
    }

    fn roll_request(game_id: Uuid, player_id: Uuid, dice_count: u8) -> RollRequest {
        RollRequest {
            game_id,
            player_id,
            dice_count,
        }
    }

    #[test]
    fn unscripted_roll_is_rejected() {
        let simulator = Simulator::new();
        let (game_id, alice, _) = two_player_game(&simulator);

        let err = simulator
            .roll(roll_request(game_id, alice, 6))
            .unwrap_err();
        assert_eq!(err.code, error_codes::NO_SCRIPTED_ROLL);
    }

    #[test]
    fn roll_enforces_turn_ownership_and_dice_count() {
        let simulator = Simulator::new();
        let (game_id, alice, bob) = two_player_game(&simulator);
        simulator.script_roll(
            game_id,
            ScriptedRoll {
                dice_values: vec![1, 1, 2, 3, 4, 6],
                kept_dice: vec![1, 1],
                score: 200,
            },
        );

        let err = simulator.roll(roll_request(game_id, bob, 6)).unwrap_err();
        assert_eq!(err.code, error_codes::NOT_YOUR_TURN);

        let err = simulator.roll(roll_request(game_id, alice, 4)).unwrap_err();
        assert_eq!(err.code, error_codes::BAD_DICE_COUNT);

        let action = simulator.roll(roll_request(game_id, alice, 6)).unwrap();
        assert_eq!(action.action_number, 1);
        assert_eq!(action.available_dice, 4);
        assert!(action.is_pending());

        // Pending action blocks a second roll.
        let err = simulator.roll(roll_request(game_id, alice, 4)).unwrap_err();
        assert_eq!(err.code, error_codes::ACTION_PENDING);
    }

    #[test]
    fn continue_requires_announced_scoring_dice() {
        let simulator = Simulator::new();
        let (game_id, alice, _) = two_player_game(&simulator);
        simulator.script_roll(
            game_id,
            ScriptedRoll {
                dice_values: vec![1, 5, 2, 3, 4, 6],
                kept_dice: vec![1, 5],
                score: 150,
            },
        );
        simulator.roll(roll_request(game_id, alice, 6)).unwrap();

        // A non-scoring die is not acceptable to keep.
        let err = simulator
            .record(RecordRequest {
                game_id,
                player_id: alice,
                kept_dice: vec![2],
                outcome: TurnOutcome::Continue,
            })
            .unwrap_err();
        assert_eq!(err.code, error_codes::BAD_KEPT_DICE);

        let resolved = simulator
            .record(RecordRequest {
                game_id,
                player_id: alice,
                kept_dice: vec![1],
                outcome: TurnOutcome::Continue,
            })
            .unwrap();
        assert_eq!(resolved.turn_action_outcome, Some(TurnOutcome::Continue));

        // The follow-up roll must use the announced remainder.
        simulator.script_roll(game_id, ScriptedRoll::farkle(vec![2, 3, 4, 6]));
        let err = simulator.roll(roll_request(game_id, alice, 6)).unwrap_err();
        assert_eq!(err.code, error_codes::BAD_DICE_COUNT);
        simulator.roll(roll_request(game_id, alice, 4)).unwrap();
    }

    #[test]
    fn bank_closes_the_turn_and_rotates_players() {
        let simulator = Simulator::new();
        let (game_id, alice, bob) = two_player_game(&simulator);
        let mut updates = simulator.subscribe();
        simulator.script_roll(
            game_id,
            ScriptedRoll {
                dice_values: vec![1, 1, 1, 2, 3, 4],
                kept_dice: vec![1, 1, 1],
                score: 300,
            },
        );
        simulator.roll(roll_request(game_id, alice, 6)).unwrap();

        // Busting a scoring roll is not allowed.
        let err = simulator
            .record(RecordRequest {
                game_id,
                player_id: alice,
                kept_dice: vec![],
                outcome: TurnOutcome::Bust,
            })
            .unwrap_err();
        assert_eq!(err.code, error_codes::BAD_OUTCOME);

        simulator
            .record(RecordRequest {
                game_id,
                player_id: alice,
                kept_dice: vec![],
                outcome: TurnOutcome::Bank,
            })
            .unwrap();

        let state = simulator.turn_state(game_id).unwrap();
        assert_eq!(state.turn_number, 2);
        assert_eq!(state.current_player_id, bob);
        assert!(state.actions.is_empty());

        // Roll append, resolve, then turn close.
        assert!(matches!(
            updates.try_recv().unwrap(),
            TurnUpdate::Action { .. }
        ));
        assert!(matches!(
            updates.try_recv().unwrap(),
            TurnUpdate::Action { .. }
        ));
        match updates.try_recv().unwrap() {
            TurnUpdate::TurnClosed {
                outcome,
                banked_score,
                next_player_id,
                ..
            } => {
                assert_eq!(outcome, TurnOutcome::Bank);
                assert_eq!(banked_score, 300);
                assert_eq!(next_player_id, bob);
            }
            update => panic!("expected TurnClosed, got {update:?}"),
        }
    }

    #[test]
    fn bust_forfeits_the_turn_score() {
        let simulator = Simulator::new();
        let (game_id, alice, _) = two_player_game(&simulator);
        let mut updates = simulator.subscribe();
        simulator.script_roll(game_id, ScriptedRoll::farkle(vec![2, 3, 4, 6, 6, 2]));
        simulator.roll(roll_request(game_id, alice, 6)).unwrap();

        // A farkle can only bust.
        let err = simulator
            .record(RecordRequest {
                game_id,
                player_id: alice,
                kept_dice: vec![],
                outcome: TurnOutcome::Bank,
            })
            .unwrap_err();
        assert_eq!(err.code, error_codes::BAD_OUTCOME);

        simulator
            .record(RecordRequest {
                game_id,
                player_id: alice,
                kept_dice: vec![],
                outcome: TurnOutcome::Bust,
            })
            .unwrap();

        let closed = std::iter::from_fn(|| updates.try_recv().ok())
            .find_map(|update| match update {
                TurnUpdate::TurnClosed { banked_score, .. } => Some(banked_score),
                _ => None,
            })
            .unwrap();
        assert_eq!(closed, 0);
    }
}
