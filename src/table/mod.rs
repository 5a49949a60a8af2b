//! The table: placed melds and the operations that may touch them.
//!
//! Once placed, a meld is immutable except through two moves:
//!
//! - **extend**: a hand offers extra cards; the union is re-evaluated and
//!   atomically replaces the meld only if it is itself valid.
//! - **joker steal**: a natural card that matches exactly what a table
//!   joker stands for swaps places with it; the joker goes back to a hand.
//!
//! What a joker stands for was fixed when its meld was evaluated: the
//! `Slot` layout records the resolved rank (and ace interpretation) for
//! runs, and the set rank for sets.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cards::{Card, Suit, ACE_HIGH_RANK};
use crate::combo::{evaluate, ComboError, ComboKind, Evaluation, Slot};
use crate::core::PlayerId;

/// Identifier for a placed meld, unique within one session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeldId(pub u32);

impl MeldId {
    /// Create a new meld ID.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MeldId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "meld #{}", self.0)
    }
}

/// A validated combination owned by the table.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Meld {
    pub id: MeldId,
    /// The player who originally placed it.
    pub owner: PlayerId,
    pub kind: ComboKind,
    pub score: u32,
    slots: Vec<Slot>,
}

impl Meld {
    /// The resolved layout, in sequence order for runs.
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Iterate the physical cards in the meld.
    pub fn cards(&self) -> impl Iterator<Item = Card> + '_ {
        self.slots.iter().map(|s| s.card)
    }

    /// Number of cards in the meld.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// A meld is never empty; provided for completeness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Failures of table operations.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("that meld no longer exists")]
    UnknownMeld,
    #[error("the extended meld would be invalid: {0}")]
    InvalidExtension(#[from] ComboError),
    #[error("no joker in that meld stands for {card}")]
    NoMatchingJoker { card: Card },
}

/// All melds currently on the table.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Table {
    melds: Vec<Meld>,
    next_id: u32,
}

impl Table {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an already-validated combination.
    pub fn place(&mut self, owner: PlayerId, eval: Evaluation) -> MeldId {
        let id = MeldId::new(self.next_id);
        self.next_id += 1;
        self.melds.push(Meld {
            id,
            owner,
            kind: eval.kind,
            score: eval.score,
            slots: eval.slots,
        });
        id
    }

    /// All melds, in placement order.
    #[must_use]
    pub fn melds(&self) -> &[Meld] {
        &self.melds
    }

    /// Look up a meld by id.
    #[must_use]
    pub fn get(&self, id: MeldId) -> Option<&Meld> {
        self.melds.iter().find(|m| m.id == id)
    }

    /// Total number of cards held by the table.
    #[must_use]
    pub fn card_count(&self) -> usize {
        self.melds.iter().map(Meld::len).sum()
    }

    /// Extend a meld with cards offered from a hand.
    ///
    /// The union of the existing meld and the offered cards is re-run
    /// through `evaluate`; if valid it atomically replaces the meld and
    /// the score delta is returned. On failure nothing changes.
    pub fn extend(&mut self, id: MeldId, offered: &[Card]) -> Result<u32, TableError> {
        let index = self
            .melds
            .iter()
            .position(|m| m.id == id)
            .ok_or(TableError::UnknownMeld)?;

        let mut union: Vec<Card> = self.melds[index].cards().collect();
        union.extend_from_slice(offered);
        let eval = evaluate(&union)?;

        let old_score = self.melds[index].score;
        let meld = &mut self.melds[index];
        meld.kind = eval.kind;
        meld.score = eval.score;
        meld.slots = eval.slots;
        // The union contains every old card, so the score never shrinks.
        Ok(eval.score.saturating_sub(old_score))
    }

    /// Exchange a table joker for the natural card it stands in for.
    ///
    /// For a set the natural must carry the set's rank and a suit not
    /// already present; for a run it must match a joker slot's resolved
    /// rank and the run's suit. Returns the freed joker.
    pub fn steal(&mut self, id: MeldId, natural: Card) -> Result<Card, TableError> {
        let meld = self
            .melds
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(TableError::UnknownMeld)?;

        let no_match = TableError::NoMatchingJoker { card: natural };
        if natural.is_joker() {
            return Err(no_match);
        }

        let slot_index = match meld.kind {
            ComboKind::Set => {
                let set_rank = meld.slots[0].rank;
                let suit_taken = meld
                    .slots
                    .iter()
                    .any(|s| !s.card.is_joker() && s.card.suit == natural.suit);
                if natural.rank != set_rank || suit_taken {
                    return Err(no_match);
                }
                meld.slots.iter().position(|s| s.card.is_joker())
            }
            ComboKind::Run => {
                let run_suit = meld.slots[0].suit;
                if natural.suit != run_suit {
                    return Err(no_match);
                }
                meld.slots.iter().position(|s| {
                    s.card.is_joker()
                        && (s.rank == natural.rank
                            || (s.rank == ACE_HIGH_RANK && natural.rank == 1))
                })
            }
        };

        let slot = match slot_index {
            Some(i) => &mut meld.slots[i],
            None => return Err(no_match),
        };

        let joker = slot.card;
        slot.card = natural;
        if meld.kind == ComboKind::Set {
            slot.suit = natural.suit;
        }
        Ok(joker)
    }
}
