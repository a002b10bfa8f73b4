//! Error taxonomy: fatal session conditions, sequencing-contract violations
//! and the distinguished cancellation rejection.

use thiserror::Error;

use crate::engine::SlotName;

/// Errors surfaced by sequence controllers and the formula sequencer.
#[derive(Debug, Error)]
pub enum SequenceError {
    /// The in-flight playback was superseded or explicitly stopped.
    ///
    /// This is a distinguished rejection, not a failure: callers awaiting a
    /// superseded sequence must treat it as "sequence did not complete" and
    /// never surface it as a user-facing error.
    #[error("sequence cancelled")]
    Cancelled,
    /// A sequencing-contract precondition was violated by the caller.
    #[error("sequence requires the `{required}` slot to be visible")]
    SlotNotVisible {
        /// Slot that must be visible before the sequence may start.
        required: SlotName,
    },
    /// The engine has no loaded assets for the requested slot or glyph.
    #[error("engine is not ready: {0}")]
    EngineNotReady(String),
}

impl SequenceError {
    /// Whether this error is the distinguished cancellation rejection.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SequenceError::Cancelled)
    }

    /// Whether this error is a sequencing-contract violation.
    ///
    /// Contract violations are programmer/caller errors and propagate up to
    /// the event router, the only caller with enough context to decide how
    /// to resynchronize.
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, SequenceError::SlotNotVisible { .. })
    }
}

/// Fatal session conditions rendered as a blocking, non-closable notice.
///
/// Once one of these is raised the session is considered unusable: there is
/// no retry path and no partial-functionality fallback.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionFatal {
    /// The launch URL was missing the player or provider identity.
    #[error("no player or provider id found")]
    MissingIdentity,
    /// The server does not know the supplied player/provider pair.
    #[error("user or provider id not found")]
    UserNotFound,
    /// A newer session for the same player superseded this one.
    #[error("new session detected")]
    SessionSuperseded,
    /// The realtime connection closed and the reconnect schedule is spent.
    #[error("something went wrong")]
    ConnectionLost,
    /// One or more startup assets failed to load.
    #[error("failed to load game assets: {0}")]
    AssetLoad(String),
}
