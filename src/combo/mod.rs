//! Combination validation and scoring.
//!
//! `evaluate` is a pure classifier: given at least three cards it decides
//! whether they form a **set** (one rank, distinct suits) or a **run** (one
//! suit, consecutive ranks), how jokers slot in, and what the group scores.
//!
//! ## Ace resolution
//!
//! Runs are checked under two interpretations: every ace low (rank 1,
//! scores 1) and every ace high (resolved rank 14, scores 10). Whichever
//! interpretation is internally consistent wins; if both are, the higher
//! score wins and ties go to the low reading.
//!
//! ## Determinism
//!
//! The result is a function of the card *multiset*: any permutation of the
//! same cards produces the same kind, score, and slot layout. Naturals are
//! ordered by resolved rank and jokers are consumed in id order.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use thiserror::Error;

use crate::cards::{rank_value, Card, Suit, ACE_HIGH_RANK};

/// What kind of combination a group forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComboKind {
    /// Cards of equal rank, pairwise distinct suits, at most 4 cards.
    Set,
    /// Cards of one suit with consecutive resolved ranks.
    Run,
}

/// One position of a resolved combination.
///
/// For runs, `rank` is the resolved rank the position occupies (`1..=14`,
/// 14 being an ace counted high) and `suit` is the run's suit - including
/// for jokers, which is how the table later knows what a joker stands for.
/// For sets, every slot carries the set's rank; a joker slot keeps the
/// `Joker` suit since any absent suit completes the set equally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    /// The physical card occupying this position.
    pub card: Card,
    /// Resolved rank the position stands for.
    pub rank: u8,
    /// Suit the position stands for.
    pub suit: Suit,
}

/// A validated combination: its kind, score, and resolved layout.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub kind: ComboKind,
    pub score: u32,
    /// Slots in sequence order (runs) or naturals-then-jokers (sets).
    pub slots: Vec<Slot>,
}

/// Why a group fails validation.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ComboError {
    #[error("a combination needs at least 3 cards")]
    TooFewCards,
    #[error("a combination needs at least one non-joker card")]
    OnlyJokers,
    #[error("cards form neither a valid set nor a valid run")]
    NotACombination,
}

/// Classify and score a candidate group of cards.
///
/// Pure and order-independent: re-invoking on any permutation of the same
/// multiset yields the same result. Sets are preferred when a group
/// satisfies both readings (only possible for all-same-rank groups padded
/// with jokers).
pub fn evaluate(cards: &[Card]) -> Result<Evaluation, ComboError> {
    if cards.len() < 3 {
        return Err(ComboError::TooFewCards);
    }

    let mut naturals: SmallVec<[Card; 14]> = SmallVec::new();
    let mut jokers: SmallVec<[Card; 4]> = SmallVec::new();
    for &card in cards {
        if card.is_joker() {
            jokers.push(card);
        } else {
            naturals.push(card);
        }
    }

    if naturals.is_empty() {
        return Err(ComboError::OnlyJokers);
    }

    // Joker assignment to slots must not depend on input order.
    jokers.sort_by_key(|c| c.id);

    if let Some(eval) = try_set(&naturals, &jokers) {
        return Ok(eval);
    }

    try_run(&naturals, &jokers).ok_or(ComboError::NotACombination)
}

/// Set reading: all naturals share a rank, suits pairwise distinct, and
/// the whole group fits in 4 cards (one per suit).
fn try_set(naturals: &[Card], jokers: &[Card]) -> Option<Evaluation> {
    let size = naturals.len() + jokers.len();
    if size > 4 {
        return None;
    }

    let rank = naturals[0].rank;
    if naturals.iter().any(|c| c.rank != rank) {
        return None;
    }

    for (i, a) in naturals.iter().enumerate() {
        if naturals[i + 1..].iter().any(|b| b.suit == a.suit) {
            return None;
        }
    }

    let mut slots: Vec<Slot> = naturals
        .iter()
        .map(|&card| Slot {
            card,
            rank,
            suit: card.suit,
        })
        .collect();
    slots.sort_by_key(|s| s.card.id);
    slots.extend(jokers.iter().map(|&card| Slot {
        card,
        rank,
        suit: Suit::Joker,
    }));

    Some(Evaluation {
        kind: ComboKind::Set,
        // Aces count high in a set.
        score: rank_value(rank, false) * size as u32,
        slots,
    })
}

/// Run reading: try both ace interpretations, keep the better one.
fn try_run(naturals: &[Card], jokers: &[Card]) -> Option<Evaluation> {
    let suit = naturals[0].suit;
    if naturals.iter().any(|c| c.suit != suit) {
        return None;
    }

    let low = check_sequence(naturals, jokers, suit, false);
    let high = check_sequence(naturals, jokers, suit, true);

    match (low, high) {
        (Some(l), Some(h)) => Some(if h.score > l.score { h } else { l }),
        (low, high) => low.or(high),
    }
}

/// Check one ace interpretation of a run.
///
/// Sorted resolved ranks must be strictly increasing; internal gaps
/// consume jokers; leftover jokers extend the open ends, upward first,
/// staying within `[1, 14]`.
fn check_sequence(
    naturals: &[Card],
    jokers: &[Card],
    suit: Suit,
    ace_high: bool,
) -> Option<Evaluation> {
    let resolve = |rank: u8| -> u8 {
        if rank == 1 && ace_high {
            ACE_HIGH_RANK
        } else {
            rank
        }
    };
    // A resolved rank of 14 is an ace, which always scores 10; everything
    // else scores per the interpretation's ace value.
    let slot_value = |resolved: u8| -> u32 {
        let rank = if resolved == ACE_HIGH_RANK { 1 } else { resolved };
        rank_value(rank, !ace_high)
    };

    let mut ordered: SmallVec<[Card; 14]> = naturals.iter().copied().collect();
    ordered.sort_by_key(|c| resolve(c.rank));

    let gap_total: usize = ordered
        .windows(2)
        .map(|pair| {
            let diff = resolve(pair[1].rank) as usize - resolve(pair[0].rank) as usize;
            diff.saturating_sub(1)
        })
        .sum();
    let duplicated = ordered
        .windows(2)
        .any(|pair| resolve(pair[0].rank) == resolve(pair[1].rank));
    if duplicated || gap_total > jokers.len() {
        return None;
    }

    let mut spare = jokers.iter().copied();
    let mut slots: Vec<Slot> = Vec::with_capacity(naturals.len() + jokers.len());
    let mut score = 0u32;

    for (i, &card) in ordered.iter().enumerate() {
        if i > 0 {
            let prev = resolve(ordered[i - 1].rank);
            for filled in prev + 1..resolve(card.rank) {
                let joker = spare.next()?;
                slots.push(Slot {
                    card: joker,
                    rank: filled,
                    suit,
                });
                score += slot_value(filled);
            }
        }
        slots.push(Slot {
            card,
            rank: resolve(card.rank),
            suit,
        });
        score += slot_value(resolve(card.rank));
    }

    // Leftover jokers go to the ends: extend upward while room remains,
    // then downward; no room on either end invalidates the reading.
    let mut low_end = resolve(ordered[0].rank);
    let mut high_end = resolve(ordered[ordered.len() - 1].rank);
    for joker in spare {
        if high_end < ACE_HIGH_RANK {
            high_end += 1;
            slots.push(Slot {
                card: joker,
                rank: high_end,
                suit,
            });
            score += slot_value(high_end);
        } else if low_end > 1 {
            low_end -= 1;
            slots.insert(
                0,
                Slot {
                    card: joker,
                    rank: low_end,
                    suit,
                },
            );
            score += slot_value(low_end);
        } else {
            return None;
        }
    }

    Some(Evaluation {
        kind: ComboKind::Run,
        score,
        slots,
    })
}
