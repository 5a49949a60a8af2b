//! Session error taxonomy.
//!
//! `ActionError` covers everything a player can be told about: rule
//! violations, turn violations, the opening contract, and resource
//! exhaustion. The `Display` strings double as the private error replies
//! sent back to the offending connection; none of these mutate state.
//!
//! `IntegrityError` is different: it means an engine invariant broke,
//! which is a bug, not a player mistake. It halts the session instead of
//! being reported to players.

use thiserror::Error;

use crate::cards::CardId;
use crate::combo::ComboError;
use crate::table::TableError;

/// A rejected player intent. No state was mutated.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    // --- lobby ---
    #[error("the game has already started")]
    JoinClosed,
    #[error("the table is full")]
    TableFull,
    #[error("at least 2 players are needed to start")]
    NotEnoughPlayers,
    #[error("the game has not started yet")]
    NotStarted,
    #[error("the round is already over")]
    RoundOver,

    // --- turn discipline ---
    #[error("it is not your turn")]
    NotYourTurn,
    #[error("you have already drawn this turn")]
    AlreadyDrawn,
    #[error("draw a card before discarding")]
    MustDrawFirst,

    // --- resources ---
    #[error("the discard pile is empty")]
    DiscardEmpty,
    #[error("no cards left to draw and nothing to recycle")]
    OutOfCards,

    // --- card ownership ---
    #[error("{0} is not in your hand")]
    NotInHand(CardId),
    #[error("{0} appears more than once in the submission")]
    DuplicateCard(CardId),

    // --- rules ---
    #[error("invalid combination: {0}")]
    InvalidCombo(#[from] ComboError),
    #[error("opening requires {needed} points in one turn, these melds total {got}")]
    OpeningTooLow { needed: u32, got: u32 },
    #[error("open with {threshold}+ points before playing on the table")]
    NotOpened { threshold: u32 },
    #[error("only a natural card can replace a table joker")]
    StealNeedsNatural,
    #[error(transparent)]
    Table(#[from] TableError),

    // --- identity ---
    #[error("unknown player")]
    UnknownPlayer,

    // --- engine ---
    #[error("the session is unavailable due to an internal error")]
    Halted,
}

/// A broken engine invariant. Never user-facing; the session halts.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("card conservation broken: expected {expected} cards, found {found}")]
    CardCount { expected: usize, found: usize },
    #[error("duplicate or out-of-range card id {0}")]
    BadCardId(CardId),
    #[error("current turn does not reference a seated player")]
    BadTurn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_reasons_are_human_readable() {
        assert_eq!(ActionError::NotYourTurn.to_string(), "it is not your turn");
        assert_eq!(
            ActionError::OpeningTooLow { needed: 51, got: 45 }.to_string(),
            "opening requires 51 points in one turn, these melds total 45"
        );
        assert_eq!(
            ActionError::NotInHand(CardId::new(7)).to_string(),
            "card #7 is not in your hand"
        );
    }

    #[test]
    fn test_combo_errors_convert() {
        let err: ActionError = ComboError::TooFewCards.into();
        assert_eq!(
            err.to_string(),
            "invalid combination: a combination needs at least 3 cards"
        );
    }
}
