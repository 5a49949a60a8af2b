//! Property tests for combination validation and scoring.
//!
//! `evaluate` treats its input as a multiset: submission order must never
//! change the verdict or the score, and the documented scoring rules must
//! hold across the whole generated space.

use proptest::prelude::*;
use proptest::sample::{select, subsequence};
use rust_rummy::{evaluate, rank_value, Card, CardId, ComboError, ComboKind, Suit};

fn natural(id: u16, suit: Suit, rank: u8) -> Card {
    Card::natural(CardId::new(id), suit, rank)
}

fn joker(id: u16) -> Card {
    Card::joker(CardId::new(id))
}

fn natural_suit() -> impl Strategy<Value = Suit> {
    select(Suit::NATURAL.to_vec())
}

/// Consecutive same-suit naturals, ace-free so the expected score is the
/// plain pip sum.
fn ace_free_run() -> impl Strategy<Value = Vec<Card>> {
    (natural_suit(), 2u8..=8, 3u8..=6).prop_map(|(suit, start, len)| {
        (start..start + len)
            .enumerate()
            .map(|(i, rank)| natural(i as u16, suit, rank))
            .collect()
    })
}

proptest! {
    #[test]
    fn prop_sets_score_rank_value_times_size(
        rank in 1u8..=13,
        suits in subsequence(Suit::NATURAL.to_vec(), 3..=4),
    ) {
        let cards: Vec<Card> = suits
            .iter()
            .enumerate()
            .map(|(i, &suit)| natural(i as u16, suit, rank))
            .collect();

        let eval = evaluate(&cards).unwrap();
        prop_assert_eq!(eval.kind, ComboKind::Set);
        prop_assert_eq!(eval.score, rank_value(rank, false) * cards.len() as u32);
    }

    #[test]
    fn prop_runs_score_their_pip_sum(cards in ace_free_run()) {
        let expected: u32 = cards.iter().map(|c| rank_value(c.rank, false)).sum();

        let eval = evaluate(&cards).unwrap();
        prop_assert_eq!(eval.kind, ComboKind::Run);
        prop_assert_eq!(eval.score, expected);
    }

    #[test]
    fn prop_run_verdict_is_order_independent(cards in ace_free_run().prop_shuffle()) {
        let expected: u32 = cards.iter().map(|c| rank_value(c.rank, false)).sum();

        let eval = evaluate(&cards).unwrap();
        prop_assert_eq!(eval.kind, ComboKind::Run);
        prop_assert_eq!(eval.score, expected);
    }

    #[test]
    fn prop_joker_gap_fill_is_order_independent(
        cards in Just(vec![
            natural(0, Suit::Hearts, 5),
            natural(1, Suit::Hearts, 6),
            joker(104),
            natural(2, Suit::Hearts, 8),
        ])
        .prop_shuffle(),
    ) {
        // The joker always lands on the missing 7.
        let eval = evaluate(&cards).unwrap();
        prop_assert_eq!(eval.kind, ComboKind::Run);
        prop_assert_eq!(eval.score, 26);

        let ranks: Vec<u8> = eval.slots.iter().map(|s| s.rank).collect();
        prop_assert_eq!(ranks, vec![5, 6, 7, 8]);
    }

    #[test]
    fn prop_mixed_suits_never_make_a_run(
        suit_a in natural_suit(),
        suit_b in natural_suit(),
        start in 2u8..=11,
    ) {
        prop_assume!(suit_a != suit_b);

        let cards = vec![
            natural(0, suit_a, start),
            natural(1, suit_b, start + 1),
            natural(2, suit_a, start + 2),
        ];
        prop_assert_eq!(evaluate(&cards), Err(ComboError::NotACombination));
    }

    #[test]
    fn prop_fewer_than_three_cards_rejected(count in 0usize..=2) {
        let cards: Vec<Card> = (0..count)
            .map(|i| natural(i as u16, Suit::Spades, 5 + i as u8))
            .collect();
        prop_assert_eq!(evaluate(&cards), Err(ComboError::TooFewCards));
    }

    #[test]
    fn prop_jokers_alone_are_rejected(count in 3usize..=4) {
        let cards: Vec<Card> = (0..count).map(|i| joker(104 + i as u16)).collect();
        prop_assert_eq!(evaluate(&cards), Err(ComboError::OnlyJokers));
    }
}

#[test]
fn test_dual_ace_picks_the_better_reading() {
    // A-2-3 must read low (6), Q-K-A must read high (30).
    let low = vec![
        natural(0, Suit::Clubs, 1),
        natural(1, Suit::Clubs, 2),
        natural(2, Suit::Clubs, 3),
    ];
    assert_eq!(evaluate(&low).unwrap().score, 6);

    let high = vec![
        natural(0, Suit::Clubs, 12),
        natural(1, Suit::Clubs, 13),
        natural(2, Suit::Clubs, 1),
    ];
    assert_eq!(evaluate(&high).unwrap().score, 30);
}
