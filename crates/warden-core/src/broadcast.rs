//! Fan-out capability for pushing events and state snapshots to observers.

use async_trait::async_trait;

use crate::protocol::ObserverMessage;

/// Abstract observer fan-out consumed by the engine.
///
/// Implementations must tolerate individual observers vanishing mid-send; a
/// broadcast never fails as a whole, so the trait is infallible by design.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn broadcast(&self, message: ObserverMessage);
}
