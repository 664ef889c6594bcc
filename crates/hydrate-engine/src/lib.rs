//! Challenge rules for the hydration tracker.
//!
//! The leaderboard aggregator and lifecycle evaluator are pure functions;
//! [`service::ChallengeService`] wires them to a [`store::Store`] and a
//! [`clock::Clock`] so every read and write sees an up-to-date status.

pub mod clock;
pub mod error;
pub mod invite;
pub mod leaderboard;
pub mod lifecycle;
pub mod service;
pub mod store;
pub mod validate;

#[cfg(test)]
mod memory;

pub use error::{Error, Result};
pub use service::ChallengeService;
pub use store::Store;
