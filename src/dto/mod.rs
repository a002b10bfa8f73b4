//! Wire payloads exchanged with the game hub and the UI shell.

/// Outbound hub methods and local player commands.
pub mod commands;
/// Game, user and leaderboard payload shapes.
pub mod game;
/// Inbound hub event envelope.
pub mod hub;
