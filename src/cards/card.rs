//! Immutable card values.
//!
//! A `Card` is a plain value: id, suit, rank. Point values are always
//! derived from the rank, never stored, so nothing a client asserts about
//! a card's worth can leak into scoring.
//!
//! Ranks run 1 (ace) to 13 (king); jokers carry rank 0 and the `Joker`
//! suit. An ace resolves to rank 14 when a run treats it as high, which is
//! why sequence code deals in "resolved ranks" in `1..=14`.

use serde::{Deserialize, Serialize};

/// Resolved rank of an ace treated as high in a run.
pub const ACE_HIGH_RANK: u8 = 14;

/// Unique identifier for one physical card.
///
/// Unique across the whole 108-card game, not per deck half.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CardId(pub u16);

impl CardId {
    /// Create a new card ID.
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }
}

impl std::fmt::Display for CardId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "card #{}", self.0)
    }
}

/// Card suit. `Joker` is its own suit with rank 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
    Joker,
}

impl Suit {
    /// The four natural suits, in deck-construction order.
    pub const NATURAL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];
}

impl std::fmt::Display for Suit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            Suit::Spades => "♠",
            Suit::Hearts => "♥",
            Suit::Diamonds => "♦",
            Suit::Clubs => "♣",
            Suit::Joker => "★",
        };
        f.write_str(symbol)
    }
}

/// One physical card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    /// Unique across the whole game.
    pub id: CardId,

    /// Suit; `Joker` for the four wildcards.
    pub suit: Suit,

    /// 1..=13 for naturals, 0 for jokers.
    pub rank: u8,
}

impl Card {
    /// Create a natural (non-joker) card.
    #[must_use]
    pub const fn natural(id: CardId, suit: Suit, rank: u8) -> Self {
        Self { id, suit, rank }
    }

    /// Create a joker.
    #[must_use]
    pub const fn joker(id: CardId) -> Self {
        Self {
            id,
            suit: Suit::Joker,
            rank: 0,
        }
    }

    /// Whether this card is a wildcard.
    #[must_use]
    pub const fn is_joker(&self) -> bool {
        matches!(self.suit, Suit::Joker)
    }
}

impl std::fmt::Display for Card {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_joker() {
            write!(f, "Joker({})", self.id.0)
        } else {
            let face = match self.rank {
                1 => "A".to_string(),
                11 => "J".to_string(),
                12 => "Q".to_string(),
                13 => "K".to_string(),
                n => n.to_string(),
            };
            write!(f, "{}{}", face, self.suit)
        }
    }
}

/// Point value of a rank.
///
/// Rank 2-9 scores its face value; 10 and court cards score 10. The ace
/// scores 1 when `low_ace` (an ace-low run) and 10 otherwise. Accepts
/// resolved ranks too: 14 is an ace treated as high and scores 10.
#[must_use]
pub const fn rank_value(rank: u8, low_ace: bool) -> u32 {
    match rank {
        1 => {
            if low_ace {
                1
            } else {
                10
            }
        }
        r if r >= 10 => 10,
        r => r as u32,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_values() {
        assert_eq!(rank_value(2, false), 2);
        assert_eq!(rank_value(9, false), 9);
        assert_eq!(rank_value(10, false), 10);
        assert_eq!(rank_value(11, false), 10);
        assert_eq!(rank_value(13, false), 10);
        assert_eq!(rank_value(14, false), 10);
    }

    #[test]
    fn test_ace_is_dual_valued() {
        assert_eq!(rank_value(1, true), 1);
        assert_eq!(rank_value(1, false), 10);
    }

    #[test]
    fn test_joker_flag() {
        assert!(Card::joker(CardId::new(104)).is_joker());
        assert!(!Card::natural(CardId::new(0), Suit::Spades, 1).is_joker());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            format!("{}", Card::natural(CardId::new(0), Suit::Hearts, 12)),
            "Q♥"
        );
        assert_eq!(
            format!("{}", Card::natural(CardId::new(1), Suit::Clubs, 1)),
            "A♣"
        );
        assert_eq!(format!("{}", Card::joker(CardId::new(107))), "Joker(107)");
    }

    #[test]
    fn test_serialization_round_trip() {
        let card = Card::natural(CardId::new(17), Suit::Diamonds, 9);
        let json = serde_json::to_string(&card).unwrap();
        let back: Card = serde_json::from_str(&json).unwrap();
        assert_eq!(card, back);
    }
}
