//! Session state: the reducer-owned store and the round phase tracker.

/// Per-round phase tracking for the event router.
pub mod round;
/// Reducer-owned session state.
pub mod store;
