//! Player identification and per-seat state.
//!
//! ## PlayerId
//!
//! Session-unique player identifier. Ids are allocated in join order and
//! are never reused within a session, so a departed player's id stays
//! dangling rather than being silently reassigned.
//!
//! ## Player
//!
//! One seat at the table: the private hand, the monotonic opening flag,
//! and the cumulative meld score.

use serde::{Deserialize, Serialize};

use crate::cards::{Card, CardId};

/// Session-unique player identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub u8);

impl PlayerId {
    /// Create a new player ID.
    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u8 {
        self.0
    }
}

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Player {}", self.0)
    }
}

/// One seat at the table.
///
/// The hand is mutated only through engine-validated actions. `has_opened`
/// is monotonic: once a player opens it can never revert, which is why the
/// flag is private and only exposed through `mark_opened`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    /// Session-unique id, assigned at join.
    pub id: PlayerId,

    /// Display name supplied at join.
    pub name: String,

    /// Private hand.
    pub hand: Vec<Card>,

    /// Cumulative score from validated melds.
    pub score: u32,

    has_opened: bool,
}

impl Player {
    /// Create a player with an empty hand.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            hand: Vec::new(),
            score: 0,
            has_opened: false,
        }
    }

    /// Whether this player has made their opening meld.
    #[must_use]
    pub fn has_opened(&self) -> bool {
        self.has_opened
    }

    /// Mark the player as opened. There is no way back.
    pub fn mark_opened(&mut self) {
        self.has_opened = true;
    }

    /// Look up a card in the hand by id.
    #[must_use]
    pub fn card(&self, id: CardId) -> Option<Card> {
        self.hand.iter().copied().find(|c| c.id == id)
    }

    /// Check whether the hand holds a card.
    #[must_use]
    pub fn holds(&self, id: CardId) -> bool {
        self.hand.iter().any(|c| c.id == id)
    }

    /// Remove a card from the hand by id.
    ///
    /// Returns the removed card, or `None` if it was not held.
    pub fn take_card(&mut self, id: CardId) -> Option<Card> {
        let pos = self.hand.iter().position(|c| c.id == id)?;
        Some(self.hand.remove(pos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::Suit;

    fn card(id: u16) -> Card {
        Card::natural(CardId::new(id), Suit::Hearts, 5)
    }

    #[test]
    fn test_player_id_display() {
        assert_eq!(format!("{}", PlayerId::new(3)), "Player 3");
    }

    #[test]
    fn test_opening_is_monotonic() {
        let mut player = Player::new(PlayerId::new(0), "amira");
        assert!(!player.has_opened());

        player.mark_opened();
        assert!(player.has_opened());
    }

    #[test]
    fn test_take_card() {
        let mut player = Player::new(PlayerId::new(0), "amira");
        player.hand.push(card(1));
        player.hand.push(card(2));

        assert!(player.holds(CardId::new(1)));
        let taken = player.take_card(CardId::new(1)).unwrap();
        assert_eq!(taken.id, CardId::new(1));
        assert!(!player.holds(CardId::new(1)));
        assert_eq!(player.hand.len(), 1);

        assert!(player.take_card(CardId::new(99)).is_none());
    }
}
