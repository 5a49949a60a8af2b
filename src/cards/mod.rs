//! Card model and piles.
//!
//! - `Card` / `CardId` / `Suit`: immutable card values with derived points
//! - `double_deck`: the 108-card game pool (two 52-card decks + 4 jokers)
//! - `DrawPile` / `DiscardPile`: the shared ordered piles

pub mod card;
pub mod deck;

pub use card::{rank_value, Card, CardId, Suit, ACE_HIGH_RANK};
pub use deck::{double_deck, DiscardPile, DrawPile, PileError, TOTAL_CARDS};
