pub mod backend;
pub mod client;
pub mod dispatcher;
pub mod events;

pub use backend::TurnBackend;
pub use client::Client;
pub use dispatcher::{DispatchStatus, Dispatcher, PlayerAction};
pub use events::Stream;
use thiserror::Error;

/// Error type for client operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The backend reported a malformed action list. Fatal to the current
    /// view; resync via the turn state endpoint instead of guessing.
    #[error("turn state corrupted: {0}")]
    InconsistentTurnState(#[from] farkle_types::InconsistentTurnState),
    /// A dispatch outside the current legal-action set. Local no-op.
    #[error("action {0:?} is not legal in the current turn state")]
    IllegalAction(PlayerAction),
    /// A dispatch attempted while another is pending. Rejected before any
    /// network call.
    #[error("a dispatch is already in flight")]
    DispatchInFlight,
    /// A continue with no dice selected. Rejected before any network call.
    #[error("cannot continue without selecting dice to keep")]
    EmptySelection,
    /// The local player does not own the turn.
    #[error("it is not this player's turn")]
    NotYourTurn,
    /// The backend refused the request (e.g. an invalid dice selection per
    /// the external scoring rules). The turn state is unchanged.
    #[error("rejected by backend ({code}): {message}")]
    Rejected {
        status: reqwest::StatusCode,
        code: String,
        message: String,
    },
    #[error("failed: {0}")]
    Failed(reqwest::StatusCode),
    #[error("reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("tungstenite error: {0}")]
    Tungstenite(#[from] tokio_tungstenite::tungstenite::Error),
    #[error("invalid data: {0}")]
    InvalidData(#[from] serde_json::Error),
    #[error("connection closed")]
    ConnectionClosed,
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
    #[error("dial timeout")]
    DialTimeout,
    #[error("invalid URL scheme: {0} (expected http or https)")]
    InvalidScheme(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
