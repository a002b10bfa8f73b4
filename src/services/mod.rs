//! Session services: the hub connection and the realtime event router.

/// Hub WebSocket connection and reconnect supervision.
pub mod hub;
/// Inbound event routing and outbound call gating.
pub mod router;
