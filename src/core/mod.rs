//! Core identity and randomness primitives.
//!
//! - `PlayerId` / `Player`: session-unique player identity and per-seat state
//! - `GameRng`: deterministic, forkable RNG for shuffling

pub mod player;
pub mod rng;

pub use player::{Player, PlayerId};
pub use rng::GameRng;
