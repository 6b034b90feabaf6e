use crate::Result;
use farkle_types::{RecordRequest, RollRequest, TurnAction};
use std::future::Future;

/// The backend interface the dispatcher is constructed with.
///
/// The scoring engine behind these calls is external and opaque: `roll`
/// returns a new pending [`TurnAction`] with the backend's scoring verdict
/// already applied, and `record` resolves the pending action with the
/// player's decision. Implementations must not retry on their own; a failed
/// call surfaces to the caller and leaves the turn state unchanged.
pub trait TurnBackend: Send + Sync {
    /// Roll `request.dice_count` dice, appending a new pending action.
    fn roll(&self, request: RollRequest) -> impl Future<Output = Result<TurnAction>> + Send;

    /// Record a bank/bust/continue decision, resolving the pending action.
    fn record(&self, request: RecordRequest) -> impl Future<Output = Result<TurnAction>> + Send;
}
