//! # rust-rummy
//!
//! An authoritative engine for Tunisian Rummy: two 52-card decks plus four
//! jokers, 14-card hands, a 51-point opening contract, and table play
//! (meld, extend, joker steal) until someone discards their last card.
//!
//! ## Design Principles
//!
//! 1. **Server-Authoritative**: Clients send intents; the engine validates
//!    everything and decides everything. No client-supplied value (card
//!    points, combo scores) is ever trusted.
//!
//! 2. **All-or-Nothing Intents**: Every intent is fully validated before
//!    any state is written, so a rejection leaves the session unchanged.
//!
//! 3. **Transport-Agnostic**: The engine speaks `Intent` in and
//!    `Outgoing` out. Sockets, bots, and tests all drive it the same way.
//!
//! ## Architecture
//!
//! - **Pure Combination Rules**: `combo::evaluate` is a pure function from
//!    cards to a validated, scored layout; the session and the table both
//!    defer to it, so there is exactly one source of rule truth.
//!
//! - **Audited Invariants**: After every accepted intent the session
//!    verifies card conservation across the 108-card pool and halts on
//!    violation rather than playing on from corrupt state.
//!
//! - **Seeded Determinism**: All shuffling flows through a seedable
//!    `GameRng`; the registry forks it per session, so whole games replay
//!    from a seed.
//!
//! ## Modules
//!
//! - `core`: Player identity and seeded RNG
//! - `cards`: Card values, deck construction, draw and discard piles
//! - `combo`: Set/run validation and scoring, joker resolution
//! - `table`: Placed melds, extension, joker stealing
//! - `session`: The turn-engine state machine, events, errors
//! - `registry`: Connection-to-session routing for a transport layer

pub mod cards;
pub mod combo;
pub mod core;
pub mod registry;
pub mod session;
pub mod table;

// Re-export commonly used types
pub use crate::core::{GameRng, Player, PlayerId};

pub use crate::cards::{
    double_deck, rank_value, Card, CardId, DiscardPile, DrawPile, Suit, TOTAL_CARDS,
};

pub use crate::combo::{evaluate, ComboError, ComboKind, Evaluation, Slot};

pub use crate::table::{Meld, MeldId, Table, TableError};

pub use crate::session::{
    ActionError, Audience, DrawSource, Event, GameSession, Intent, IntegrityError, Outgoing,
    Phase, SessionConfig, SessionSnapshot, TurnStep,
};

pub use crate::registry::{ConnectionId, Delivery, SessionId, SessionRegistry};
