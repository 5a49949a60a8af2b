//! Wire-visible intents, events, and snapshots.
//!
//! The engine is transport-agnostic: it accepts `Intent` values and
//! answers with `Outgoing` values, each tagged with an `Audience`. A
//! transport layer (socket server, test harness, bot driver) decides how
//! to move them.
//!
//! Card values are deliberately absent from `CardView`: receivers compute
//! points themselves, so a client can never assert a score.

use serde::{Deserialize, Serialize};

use crate::cards::{Card, CardId, Suit};
use crate::combo::ComboKind;
use crate::core::PlayerId;
use crate::session::game::Phase;
use crate::table::{Meld, MeldId};

/// Where to draw from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DrawSource {
    Deck,
    Discard,
}

/// A card as transmitted to clients.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    pub id: CardId,
    pub suit: Suit,
    /// 1..=13, 0 for jokers.
    pub rank: u8,
    pub is_joker: bool,
}

impl From<Card> for CardView {
    fn from(card: Card) -> Self {
        Self {
            id: card.id,
            suit: card.suit,
            rank: card.rank,
            is_joker: card.is_joker(),
        }
    }
}

/// Public facts about one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub id: PlayerId,
    pub name: String,
    pub hand_size: usize,
    pub has_opened: bool,
    pub score: u32,
}

/// A placed meld as transmitted to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeldView {
    pub id: MeldId,
    pub owner: PlayerId,
    pub kind: ComboKind,
    pub score: u32,
    /// Cards in resolved layout order.
    pub cards: Vec<CardView>,
}

impl From<&Meld> for MeldView {
    fn from(meld: &Meld) -> Self {
        Self {
            id: meld.id,
            owner: meld.owner,
            kind: meld.kind,
            score: meld.score,
            cards: meld.cards().map(CardView::from).collect(),
        }
    }
}

/// One line of the round-end settlement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementLine {
    pub player: PlayerId,
    /// Points charged for cards left in hand, or the forfeit penalty for
    /// a player who never opened.
    pub penalty: u32,
}

/// A client intent, as carried by the transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    Join { name: String },
    Start,
    Draw { source: DrawSource },
    Meld { groups: Vec<Vec<CardId>> },
    Extend { meld: MeldId, cards: Vec<CardId> },
    Steal { meld: MeldId, card: CardId },
    Discard { card: CardId },
    Leave,
}

/// An engine-emitted event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Roster changed (join or leave).
    RosterUpdated { players: Vec<PlayerSummary> },
    /// The round began; hands went out privately via `HandUpdated`.
    GameStarted {
        deck_count: usize,
        discard_top: CardView,
        current_turn: PlayerId,
        players: Vec<PlayerSummary>,
    },
    /// Private: the receiver's full hand after a change.
    HandUpdated { cards: Vec<CardView> },
    /// Private: the card just drawn.
    CardDrawn { card: CardView },
    /// Draw pile size changed.
    DeckUpdated { deck_count: usize },
    /// Table contents changed (meld, extend, or steal).
    TableUpdated {
        player: PlayerId,
        melds: Vec<MeldView>,
        player_score: u32,
    },
    /// Discard pile and/or turn changed.
    DiscardUpdated {
        top: Option<CardView>,
        current_turn: PlayerId,
    },
    /// The round ended and was settled.
    RoundEnded {
        winner: Option<PlayerId>,
        settlement: Vec<SettlementLine>,
    },
    /// Private error reply; carries a human-readable reason.
    Error { reason: String },
}

/// Delivery scope for an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    Player(PlayerId),
    Everyone,
}

/// An event plus the audience it is meant for.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outgoing {
    pub audience: Audience,
    pub event: Event,
}

impl Outgoing {
    /// Address an event to a single player.
    #[must_use]
    pub fn private(player: PlayerId, event: Event) -> Self {
        Self {
            audience: Audience::Player(player),
            event,
        }
    }

    /// Address an event to the whole session.
    #[must_use]
    pub fn broadcast(event: Event) -> Self {
        Self {
            audience: Audience::Everyone,
            event,
        }
    }
}

/// A complete per-viewer view of the session, taken after a transition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub players: Vec<PlayerSummary>,
    pub deck_count: usize,
    pub discard_top: Option<CardView>,
    pub current_turn: Option<PlayerId>,
    pub melds: Vec<MeldView>,
    /// The viewer's private hand, when the viewer is seated.
    pub your_hand: Option<Vec<CardView>>,
}
