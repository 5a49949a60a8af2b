//! The authoritative game session.
//!
//! `GameSession` is the only component that mutates shared game state.
//! Every intent is validated before anything is written, so a rejected
//! action leaves the session byte-for-byte unchanged; every accepted
//! action completes synchronously and is followed by an invariant audit.

pub mod error;
pub mod events;
pub mod game;

pub use error::{ActionError, IntegrityError};
pub use events::{
    Audience, CardView, DrawSource, Event, Intent, MeldView, Outgoing, PlayerSummary,
    SessionSnapshot, SettlementLine,
};
pub use game::{GameSession, Phase, SessionConfig, TurnStep};
