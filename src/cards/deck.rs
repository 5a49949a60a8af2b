//! Deck construction and the two shared piles.
//!
//! The game pool is two standard 52-card decks plus 4 jokers, 108 cards
//! with ids `0..108`. The draw pile is drawn from the top (the end of the
//! vec); the discard pile exposes only its most recent card.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::card::{Card, CardId, Suit};
use crate::core::GameRng;

/// Total cards in play: 2 x 52 naturals + 4 jokers.
pub const TOTAL_CARDS: usize = 108;

/// Build the unshuffled 108-card pool with ids `0..108`.
#[must_use]
pub fn double_deck() -> Vec<Card> {
    let mut cards = Vec::with_capacity(TOTAL_CARDS);
    let mut next_id = 0u16;

    for _ in 0..2 {
        for suit in Suit::NATURAL {
            for rank in 1..=13 {
                cards.push(Card::natural(CardId::new(next_id), suit, rank));
                next_id += 1;
            }
        }
    }

    for _ in 0..4 {
        cards.push(Card::joker(CardId::new(next_id)));
        next_id += 1;
    }

    cards
}

/// Pile-level failures.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum PileError {
    /// The discard pile has at most one card, so there is nothing to
    /// shuffle back into the draw pile.
    #[error("the discard pile has nothing to recycle")]
    NothingToRecycle,
}

/// The face-down draw pile. Top = end of the vec.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DrawPile {
    cards: Vec<Card>,
}

impl DrawPile {
    /// Create a draw pile from already-shuffled cards.
    #[must_use]
    pub fn from_cards(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Remove and return the top card.
    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Slide cards under the pile (bottom), preserving their order.
    ///
    /// Used when a departing player's hand is folded back into the game.
    pub fn place_under(&mut self, cards: impl IntoIterator<Item = Card>) {
        let mut bottom: Vec<Card> = cards.into_iter().collect();
        bottom.extend(self.cards.drain(..));
        self.cards = bottom;
    }

    /// Number of cards remaining.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the pile is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterate the pile, bottom to top.
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }
}

/// The face-up discard pile. Only the top card is drawable.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DiscardPile {
    cards: Vec<Card>,
}

impl DiscardPile {
    /// Push a discarded card on top.
    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Peek at the top card.
    #[must_use]
    pub fn top(&self) -> Option<Card> {
        self.cards.last().copied()
    }

    /// Remove and return the top card.
    pub fn take_top(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    /// Number of cards in the pile.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Whether the pile is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Iterate the pile, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    /// Shuffle everything except the top card back into the draw pile.
    ///
    /// The top card stays behind as the sole visible discard. Returns the
    /// number of cards recycled; fails if there is at most one card here.
    pub fn recycle_into(
        &mut self,
        draw: &mut DrawPile,
        rng: &mut GameRng,
    ) -> Result<usize, PileError> {
        if self.cards.len() <= 1 {
            return Err(PileError::NothingToRecycle);
        }

        let retained = self.cards.pop().expect("len checked above");
        let mut recycled = std::mem::take(&mut self.cards);
        rng.shuffle(&mut recycled);

        let count = recycled.len();
        draw.cards.extend(recycled);
        self.cards.push(retained);
        Ok(count)
    }
}
