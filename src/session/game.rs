//! The turn-based authoritative state machine for one game.
//!
//! One `GameSession` owns every shared resource of a game: the roster,
//! the draw and discard piles, and the table. All mutation goes through
//! the intent methods (`join`, `start`, `draw`, `meld`, `extend`,
//! `steal`, `discard`, `leave`); each validates fully before writing, so a
//! rejected intent leaves no trace.
//!
//! ## Lifecycle
//!
//! `WaitingForPlayers` -> `TurnActive(DrawPending)` -> `TurnActive(PostDraw)`
//! (cycling per player) -> `RoundEnd`. Dealing happens synchronously inside
//! `start`.
//!
//! ## Integrity
//!
//! After every accepted intent the session audits its invariants (card
//! conservation across the 108-card pool, turn pointer validity). A failed
//! audit is an engine bug: the session halts, logs the violation, and
//! rejects all further intents rather than continuing on corrupt state.

use serde::{Deserialize, Serialize};

use crate::cards::{double_deck, rank_value, Card, CardId, DiscardPile, DrawPile, TOTAL_CARDS};
use crate::combo::{evaluate, ComboError};
use crate::core::{GameRng, Player, PlayerId};
use crate::table::{MeldId, Table};

use super::error::{ActionError, IntegrityError};
use super::events::{
    Audience, CardView, DrawSource, Event, MeldView, Outgoing, PlayerSummary, SessionSnapshot,
    SettlementLine,
};

/// Tunable rules of a session.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Seats at the table.
    pub max_players: usize,
    /// Minimum combined meld score of a player's opening call.
    pub opening_threshold: u32,
    /// Points charged per joker left in a hand at settlement.
    pub joker_penalty: u32,
    /// Flat charge for a player who never opened.
    pub forfeit_penalty: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_players: 4,
            opening_threshold: 51,
            joker_penalty: 25,
            forfeit_penalty: 100,
        }
    }
}

/// Where the current player is within their turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnStep {
    /// The player must draw (deck or discard) before anything else ends
    /// their turn.
    DrawPending,
    /// The player has drawn and may meld, play on the table, and discard.
    PostDraw,
}

/// Session lifecycle phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    WaitingForPlayers,
    TurnActive(TurnStep),
    RoundEnd,
}

/// The authoritative state of one game.
#[derive(Clone, Debug)]
pub struct GameSession {
    config: SessionConfig,
    players: Vec<Player>,
    draw_pile: DrawPile,
    discard: DiscardPile,
    table: Table,
    phase: Phase,
    /// Index into `players` of the current-turn player.
    current: usize,
    next_player_id: u8,
    rng: GameRng,
    /// Append-only broadcast history; cheap to snapshot for late catch-up.
    history: im::Vector<Event>,
    halted: bool,
}

impl GameSession {
    /// Create an empty session waiting for players.
    #[must_use]
    pub fn new(config: SessionConfig, rng: GameRng) -> Self {
        Self {
            config,
            players: Vec::new(),
            draw_pile: DrawPile::default(),
            discard: DiscardPile::default(),
            table: Table::new(),
            phase: Phase::WaitingForPlayers,
            current: 0,
            next_player_id: 0,
            rng,
            history: im::Vector::new(),
            halted: false,
        }
    }

    // === Read access ===

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Seated players, in join order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// The player whose turn it is, if a turn is active.
    #[must_use]
    pub fn current_turn(&self) -> Option<PlayerId> {
        match self.phase {
            Phase::TurnActive(_) => self.players.get(self.current).map(|p| p.id),
            _ => None,
        }
    }

    /// Cards left in the draw pile.
    #[must_use]
    pub fn deck_count(&self) -> usize {
        self.draw_pile.len()
    }

    /// Cards in the discard pile.
    #[must_use]
    pub fn discard_count(&self) -> usize {
        self.discard.len()
    }

    /// The table of placed melds.
    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Whether nobody is seated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Broadcast history since the session began. O(1) clone.
    #[must_use]
    pub fn history(&self) -> im::Vector<Event> {
        self.history.clone()
    }

    /// A complete view of the session for one viewer, including their
    /// private hand when they are seated.
    #[must_use]
    pub fn snapshot(&self, viewer: Option<PlayerId>) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            players: self.roster(),
            deck_count: self.draw_pile.len(),
            discard_top: self.discard.top().map(CardView::from),
            current_turn: self.current_turn(),
            melds: self.table.melds().iter().map(MeldView::from).collect(),
            your_hand: viewer.and_then(|id| {
                self.players
                    .iter()
                    .find(|p| p.id == id)
                    .map(|p| p.hand.iter().copied().map(CardView::from).collect())
            }),
        }
    }

    // === Intents ===

    /// Seat a new player. Only legal before the game starts.
    pub fn join(&mut self, name: &str) -> Result<(PlayerId, Vec<Outgoing>), ActionError> {
        self.ensure_live()?;
        if self.phase != Phase::WaitingForPlayers {
            return Err(ActionError::JoinClosed);
        }
        if self.players.len() >= self.config.max_players {
            return Err(ActionError::TableFull);
        }

        let id = PlayerId::new(self.next_player_id);
        self.next_player_id += 1;
        self.players.push(Player::new(id, name));
        tracing::info!(player = %id, name, "player joined");

        let out = vec![Outgoing::broadcast(Event::RosterUpdated {
            players: self.roster(),
        })];
        self.commit(out).map(|out| (id, out))
    }

    /// Build and deal the game. Any seated player may start it.
    pub fn start(&mut self, player: PlayerId) -> Result<Vec<Outgoing>, ActionError> {
        self.ensure_live()?;
        self.player_index(player)?;
        if self.phase != Phase::WaitingForPlayers {
            return Err(ActionError::JoinClosed);
        }
        if self.players.len() < 2 {
            return Err(ActionError::NotEnoughPlayers);
        }

        let mut deck = double_deck();
        self.rng.shuffle(&mut deck);
        self.draw_pile = DrawPile::from_cards(deck);

        // 14 cards each, a 15th to the first player.
        for idx in 0..self.players.len() {
            for _ in 0..14 {
                let card = self.draw_pile.draw().ok_or(ActionError::OutOfCards)?;
                self.players[idx].hand.push(card);
            }
        }
        let extra = self.draw_pile.draw().ok_or(ActionError::OutOfCards)?;
        self.players[0].hand.push(extra);

        let first_discard = self.draw_pile.draw().ok_or(ActionError::OutOfCards)?;
        self.discard.push(first_discard);

        self.current = 0;
        self.phase = Phase::TurnActive(TurnStep::DrawPending);
        tracing::info!(players = self.players.len(), "game started");

        let mut out: Vec<Outgoing> = self
            .players
            .iter()
            .map(|p| Outgoing::private(p.id, self.hand_event(p)))
            .collect();
        out.push(Outgoing::broadcast(Event::GameStarted {
            deck_count: self.draw_pile.len(),
            discard_top: CardView::from(first_discard),
            current_turn: self.players[0].id,
            players: self.roster(),
        }));
        self.commit(out)
    }

    /// Draw one card from the deck or the discard pile.
    ///
    /// Deck draws recycle the discard pile first when the deck is empty;
    /// if there is nothing to recycle either, the session is out of cards.
    pub fn draw(
        &mut self,
        player: PlayerId,
        source: DrawSource,
    ) -> Result<Vec<Outgoing>, ActionError> {
        self.ensure_live()?;
        let idx = self.require_turn(player)?;
        if self.phase == Phase::TurnActive(TurnStep::PostDraw) {
            return Err(ActionError::AlreadyDrawn);
        }

        let mut discard_changed = false;
        let card = match source {
            DrawSource::Discard => {
                discard_changed = true;
                self.discard.take_top().ok_or(ActionError::DiscardEmpty)?
            }
            DrawSource::Deck => {
                if self.draw_pile.is_empty() {
                    let recycled = self
                        .discard
                        .recycle_into(&mut self.draw_pile, &mut self.rng)
                        .map_err(|_| ActionError::OutOfCards)?;
                    tracing::debug!(recycled, "discard pile recycled into draw pile");
                }
                self.draw_pile.draw().ok_or(ActionError::OutOfCards)?
            }
        };

        self.players[idx].hand.push(card);
        self.phase = Phase::TurnActive(TurnStep::PostDraw);
        tracing::debug!(player = %player, ?source, "card drawn");

        let mut out = vec![
            Outgoing::private(player, Event::CardDrawn {
                card: CardView::from(card),
            }),
            Outgoing::broadcast(Event::DeckUpdated {
                deck_count: self.draw_pile.len(),
            }),
        ];
        if discard_changed {
            out.push(Outgoing::broadcast(Event::DiscardUpdated {
                top: self.discard.top().map(CardView::from),
                current_turn: player,
            }));
        }
        self.commit(out)
    }

    /// Place one or more combinations from the hand onto the table.
    ///
    /// Every group is validated independently; any invalid group rejects
    /// the whole call. A player who has not opened must reach the opening
    /// threshold with the combined score of this single call.
    pub fn meld(
        &mut self,
        player: PlayerId,
        groups: &[Vec<CardId>],
    ) -> Result<Vec<Outgoing>, ActionError> {
        self.ensure_live()?;
        let idx = self.require_turn(player)?;
        if groups.is_empty() {
            return Err(ComboError::TooFewCards.into());
        }

        let resolved = self.resolve_groups(idx, groups)?;
        let mut evals = Vec::with_capacity(resolved.len());
        let mut total = 0u32;
        for cards in &resolved {
            let eval = evaluate(cards)?;
            total += eval.score;
            evals.push(eval);
        }

        if !self.players[idx].has_opened() && total < self.config.opening_threshold {
            return Err(ActionError::OpeningTooLow {
                needed: self.config.opening_threshold,
                got: total,
            });
        }

        // All groups validated; now move the cards.
        for (cards, eval) in resolved.iter().zip(evals) {
            for card in cards {
                self.players[idx].take_card(card.id);
            }
            self.table.place(player, eval);
        }
        self.players[idx].mark_opened();
        self.players[idx].score += total;
        tracing::debug!(player = %player, groups = groups.len(), total, "melds placed");

        let out = vec![
            Outgoing::private(player, self.hand_event(&self.players[idx])),
            Outgoing::broadcast(self.table_event(idx)),
        ];
        self.commit(out)
    }

    /// Extend an existing table meld with cards from the hand.
    pub fn extend(
        &mut self,
        player: PlayerId,
        meld: MeldId,
        cards: &[CardId],
    ) -> Result<Vec<Outgoing>, ActionError> {
        self.ensure_live()?;
        let idx = self.require_turn(player)?;
        self.require_opened(idx)?;

        let offered = self.resolve_group(idx, cards)?;
        let delta = self.table.extend(meld, &offered)?;

        for card in &offered {
            self.players[idx].take_card(card.id);
        }
        self.players[idx].score += delta;
        tracing::debug!(player = %player, %meld, delta, "meld extended");

        let out = vec![
            Outgoing::private(player, self.hand_event(&self.players[idx])),
            Outgoing::broadcast(self.table_event(idx)),
        ];
        self.commit(out)
    }

    /// Swap a hand natural for the table joker standing in its place.
    /// The joker returns to the hand, free to be played again.
    pub fn steal(
        &mut self,
        player: PlayerId,
        meld: MeldId,
        card: CardId,
    ) -> Result<Vec<Outgoing>, ActionError> {
        self.ensure_live()?;
        let idx = self.require_turn(player)?;
        self.require_opened(idx)?;

        let natural = self.players[idx]
            .card(card)
            .ok_or(ActionError::NotInHand(card))?;
        if natural.is_joker() {
            return Err(ActionError::StealNeedsNatural);
        }

        let joker = self.table.steal(meld, natural)?;
        // The natural was just looked up; if it somehow vanished the audit
        // below halts the session.
        self.players[idx].take_card(card);
        self.players[idx].hand.push(joker);
        tracing::debug!(player = %player, %meld, card = %natural, "table joker stolen");

        let out = vec![
            Outgoing::private(player, self.hand_event(&self.players[idx])),
            Outgoing::broadcast(self.table_event(idx)),
        ];
        self.commit(out)
    }

    /// Discard one card, ending the turn. An emptied hand ends the round.
    pub fn discard(
        &mut self,
        player: PlayerId,
        card: CardId,
    ) -> Result<Vec<Outgoing>, ActionError> {
        self.ensure_live()?;
        let idx = self.require_turn(player)?;
        if self.phase == Phase::TurnActive(TurnStep::DrawPending) {
            return Err(ActionError::MustDrawFirst);
        }
        if !self.players[idx].holds(card) {
            return Err(ActionError::NotInHand(card));
        }

        let discarded = self.players[idx]
            .take_card(card)
            .ok_or(ActionError::NotInHand(card))?;
        self.discard.push(discarded);

        let mut out = vec![Outgoing::private(player, self.hand_event(&self.players[idx]))];

        if self.players[idx].hand.is_empty() {
            self.phase = Phase::RoundEnd;
            let settlement = self.settle(player);
            tracing::info!(winner = %player, "round ended");
            out.push(Outgoing::broadcast(Event::DiscardUpdated {
                top: self.discard.top().map(CardView::from),
                current_turn: player,
            }));
            out.push(Outgoing::broadcast(Event::RoundEnded {
                winner: Some(player),
                settlement,
            }));
        } else {
            self.current = (self.current + 1) % self.players.len();
            self.phase = Phase::TurnActive(TurnStep::DrawPending);
            let next = self.players[self.current].id;
            tracing::debug!(player = %player, next = %next, "turn advanced");
            out.push(Outgoing::broadcast(Event::DiscardUpdated {
                top: self.discard.top().map(CardView::from),
                current_turn: next,
            }));
        }
        self.commit(out)
    }

    /// Remove a player from the session.
    ///
    /// Mid-game, the leaver's hand is shuffled under the draw pile so the
    /// 108-card pool stays whole and their melds stay on the table. If it
    /// was their turn the next player starts fresh; if fewer than two
    /// players remain the round ends abandoned, with no winner.
    pub fn leave(&mut self, player: PlayerId) -> Result<Vec<Outgoing>, ActionError> {
        let idx = self.player_index(player)?;
        let was_current = matches!(self.phase, Phase::TurnActive(_)) && idx == self.current;
        let mut leaver = self.players.remove(idx);
        tracing::info!(player = %player, name = %leaver.name, "player left");

        if self.phase != Phase::WaitingForPlayers {
            self.rng.shuffle(&mut leaver.hand);
            self.draw_pile.place_under(leaver.hand.drain(..));
        }

        let mut out = vec![Outgoing::broadcast(Event::RosterUpdated {
            players: self.roster(),
        })];

        if matches!(self.phase, Phase::TurnActive(_)) {
            if self.players.len() < 2 {
                self.phase = Phase::RoundEnd;
                tracing::info!("round abandoned: not enough players");
                out.push(Outgoing::broadcast(Event::RoundEnded {
                    winner: None,
                    settlement: Vec::new(),
                }));
            } else {
                if idx < self.current {
                    self.current -= 1;
                } else if idx == self.current {
                    // Removal already shifted the next player into place.
                    self.current %= self.players.len();
                    self.phase = Phase::TurnActive(TurnStep::DrawPending);
                }
                if was_current {
                    out.push(Outgoing::broadcast(Event::DiscardUpdated {
                        top: self.discard.top().map(CardView::from),
                        current_turn: self.players[self.current].id,
                    }));
                }
            }
        }
        self.commit(out)
    }

    // === Invariants ===

    /// Check the session invariants.
    ///
    /// Once the game has started: every one of the 108 card ids lives in
    /// exactly one of draw pile, discard pile, a hand, or a table meld,
    /// and the turn pointer references a seated player.
    pub fn audit(&self) -> Result<(), IntegrityError> {
        if self.phase == Phase::WaitingForPlayers {
            return Ok(());
        }

        // 108 ids fit in a single u128 occupancy mask.
        let mut seen = 0u128;
        let mut count = 0usize;
        let loose = self
            .draw_pile
            .iter()
            .chain(self.discard.iter())
            .chain(self.players.iter().flat_map(|p| p.hand.iter()))
            .copied();
        let placed = self.table.melds().iter().flat_map(|m| m.cards());
        for card in loose.chain(placed) {
            let id = card.id.raw() as usize;
            if id >= TOTAL_CARDS {
                return Err(IntegrityError::BadCardId(card.id));
            }
            let bit = 1u128 << id;
            if seen & bit != 0 {
                return Err(IntegrityError::BadCardId(card.id));
            }
            seen |= bit;
            count += 1;
        }
        if count != TOTAL_CARDS {
            return Err(IntegrityError::CardCount {
                expected: TOTAL_CARDS,
                found: count,
            });
        }

        if matches!(self.phase, Phase::TurnActive(_)) && self.current >= self.players.len() {
            return Err(IntegrityError::BadTurn);
        }
        Ok(())
    }

    // === Internals ===

    fn ensure_live(&self) -> Result<(), ActionError> {
        if self.halted {
            Err(ActionError::Halted)
        } else {
            Ok(())
        }
    }

    fn player_index(&self, player: PlayerId) -> Result<usize, ActionError> {
        self.players
            .iter()
            .position(|p| p.id == player)
            .ok_or(ActionError::UnknownPlayer)
    }

    fn require_turn(&self, player: PlayerId) -> Result<usize, ActionError> {
        match self.phase {
            Phase::WaitingForPlayers => Err(ActionError::NotStarted),
            Phase::RoundEnd => Err(ActionError::RoundOver),
            Phase::TurnActive(_) => {
                let idx = self.player_index(player)?;
                if idx == self.current {
                    Ok(idx)
                } else {
                    Err(ActionError::NotYourTurn)
                }
            }
        }
    }

    fn require_opened(&self, idx: usize) -> Result<(), ActionError> {
        if self.players[idx].has_opened() {
            Ok(())
        } else {
            Err(ActionError::NotOpened {
                threshold: self.config.opening_threshold,
            })
        }
    }

    /// Resolve one group of hand card ids, rejecting duplicates.
    fn resolve_group(&self, idx: usize, ids: &[CardId]) -> Result<Vec<Card>, ActionError> {
        let mut cards = Vec::with_capacity(ids.len());
        for (i, &id) in ids.iter().enumerate() {
            if ids[..i].contains(&id) {
                return Err(ActionError::DuplicateCard(id));
            }
            let card = self.players[idx].card(id).ok_or(ActionError::NotInHand(id))?;
            cards.push(card);
        }
        Ok(cards)
    }

    /// Resolve meld groups; a card id may appear in at most one group.
    fn resolve_groups(
        &self,
        idx: usize,
        groups: &[Vec<CardId>],
    ) -> Result<Vec<Vec<Card>>, ActionError> {
        let mut seen: Vec<CardId> = Vec::new();
        let mut resolved = Vec::with_capacity(groups.len());
        for group in groups {
            for &id in group {
                if seen.contains(&id) {
                    return Err(ActionError::DuplicateCard(id));
                }
                seen.push(id);
            }
            resolved.push(self.resolve_group(idx, group)?);
        }
        Ok(resolved)
    }

    fn roster(&self) -> Vec<PlayerSummary> {
        self.players
            .iter()
            .map(|p| PlayerSummary {
                id: p.id,
                name: p.name.clone(),
                hand_size: p.hand.len(),
                has_opened: p.has_opened(),
                score: p.score,
            })
            .collect()
    }

    fn hand_event(&self, player: &Player) -> Event {
        Event::HandUpdated {
            cards: player.hand.iter().copied().map(CardView::from).collect(),
        }
    }

    fn table_event(&self, idx: usize) -> Event {
        Event::TableUpdated {
            player: self.players[idx].id,
            melds: self.table.melds().iter().map(MeldView::from).collect(),
            player_score: self.players[idx].score,
        }
    }

    /// Charge every non-winner for the cards left in their hand; a player
    /// who never opened pays the flat forfeit instead.
    fn settle(&self, winner: PlayerId) -> Vec<SettlementLine> {
        self.players
            .iter()
            .filter(|p| p.id != winner)
            .map(|p| {
                let penalty = if p.has_opened() {
                    p.hand
                        .iter()
                        .map(|c| {
                            if c.is_joker() {
                                self.config.joker_penalty
                            } else {
                                rank_value(c.rank, false)
                            }
                        })
                        .sum()
                } else {
                    self.config.forfeit_penalty
                };
                SettlementLine {
                    player: p.id,
                    penalty,
                }
            })
            .collect()
    }

    /// Audit after a successful mutation, then hand the events back.
    fn commit(&mut self, out: Vec<Outgoing>) -> Result<Vec<Outgoing>, ActionError> {
        if let Err(violation) = self.audit() {
            self.halted = true;
            tracing::error!(%violation, "session halted: invariant violated");
            return Err(ActionError::Halted);
        }
        for outgoing in &out {
            if outgoing.audience == Audience::Everyone {
                self.history.push_back(outgoing.event.clone());
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> GameSession {
        GameSession::new(SessionConfig::default(), GameRng::new(42))
    }

    /// Id of a card in the unshuffled pool: `copy` 0/1, suit in
    /// spades/hearts/diamonds/clubs order, rank 1..=13. Jokers are 104..108.
    fn id(copy: u16, suit: usize, rank: u16) -> CardId {
        CardId::new(copy * 52 + suit as u16 * 13 + (rank - 1))
    }

    /// Build a started two-plus-player session with exact hands; all other
    /// cards go to the draw pile except one seeded discard.
    fn scripted(hands: Vec<Vec<CardId>>) -> GameSession {
        let mut s = session();
        for (i, _) in hands.iter().enumerate() {
            s.join(&format!("p{i}")).unwrap();
        }

        let pool = double_deck();
        for (i, ids) in hands.iter().enumerate() {
            s.players[i].hand = ids.iter().map(|id| pool[id.raw() as usize]).collect();
        }
        let taken: Vec<CardId> = hands.into_iter().flatten().collect();
        let mut rest: Vec<Card> = pool
            .into_iter()
            .filter(|c| !taken.contains(&c.id))
            .collect();
        let seed_discard = rest.remove(0);
        s.discard.push(seed_discard);
        s.draw_pile = DrawPile::from_cards(rest);
        s.current = 0;
        s.phase = Phase::TurnActive(TurnStep::DrawPending);
        s.audit().unwrap();
        s
    }

    fn p(n: u8) -> PlayerId {
        PlayerId::new(n)
    }

    #[test]
    fn test_join_and_start() {
        let mut s = session();
        let (a, _) = s.join("amira").unwrap();
        let (b, _) = s.join("karim").unwrap();
        assert_eq!(a, p(0));
        assert_eq!(b, p(1));

        let out = s.start(a).unwrap();
        assert_eq!(s.phase(), Phase::TurnActive(TurnStep::DrawPending));
        assert_eq!(s.current_turn(), Some(a));
        assert_eq!(s.players()[0].hand.len(), 15);
        assert_eq!(s.players()[1].hand.len(), 14);
        assert_eq!(s.discard_count(), 1);
        assert_eq!(s.deck_count(), 108 - 15 - 14 - 1);
        s.audit().unwrap();

        // Private hands plus one broadcast snapshot.
        let broadcasts = out
            .iter()
            .filter(|o| o.audience == Audience::Everyone)
            .count();
        assert_eq!(broadcasts, 1);
    }

    #[test]
    fn test_start_needs_two_players() {
        let mut s = session();
        let (a, _) = s.join("solo").unwrap();
        assert_eq!(s.start(a), Err(ActionError::NotEnoughPlayers));
    }

    #[test]
    fn test_join_rejected_after_start_and_when_full() {
        let mut s = session();
        for i in 0..4 {
            s.join(&format!("p{i}")).unwrap();
        }
        assert_eq!(s.join("fifth").unwrap_err(), ActionError::TableFull);

        s.start(p(0)).unwrap();
        assert_eq!(s.join("late").unwrap_err(), ActionError::JoinClosed);
    }

    #[test]
    fn test_turn_enforcement() {
        let mut s = scripted(vec![
            vec![id(0, 0, 5), id(0, 0, 6)],
            vec![id(0, 1, 5), id(0, 1, 6)],
        ]);

        // Player 1 is not the current player: everything is rejected
        // without any state change.
        let before = s.snapshot(Some(p(1)));
        assert_eq!(
            s.draw(p(1), DrawSource::Deck),
            Err(ActionError::NotYourTurn)
        );
        assert_eq!(
            s.meld(p(1), &[vec![id(0, 1, 5)]]),
            Err(ActionError::NotYourTurn)
        );
        assert_eq!(s.discard(p(1), id(0, 1, 5)), Err(ActionError::NotYourTurn));
        assert_eq!(s.snapshot(Some(p(1))), before);
    }

    #[test]
    fn test_draw_only_once_per_turn() {
        let mut s = scripted(vec![vec![id(0, 0, 5)], vec![id(0, 1, 5)]]);

        s.draw(p(0), DrawSource::Deck).unwrap();
        assert_eq!(s.phase(), Phase::TurnActive(TurnStep::PostDraw));
        assert_eq!(
            s.draw(p(0), DrawSource::Deck),
            Err(ActionError::AlreadyDrawn)
        );
        assert_eq!(
            s.draw(p(0), DrawSource::Discard),
            Err(ActionError::AlreadyDrawn)
        );
    }

    #[test]
    fn test_draw_from_discard() {
        let mut s = scripted(vec![vec![id(0, 0, 5)], vec![id(0, 1, 5)]]);
        let top = s.discard.top().unwrap();

        let out = s.draw(p(0), DrawSource::Discard).unwrap();
        assert!(s.players()[0].holds(top.id));
        assert_eq!(s.discard_count(), 0);
        assert!(out.iter().any(|o| matches!(
            o.event,
            Event::DiscardUpdated { top: None, .. }
        )));
    }

    #[test]
    fn test_discard_advances_turn_and_wraps() {
        let mut s = scripted(vec![
            vec![id(0, 0, 5), id(0, 0, 7)],
            vec![id(0, 1, 5), id(0, 1, 7)],
        ]);

        s.draw(p(0), DrawSource::Deck).unwrap();
        assert_eq!(s.discard(p(0), id(0, 0, 9)), Err(ActionError::NotInHand(id(0, 0, 9))));
        s.discard(p(0), id(0, 0, 5)).unwrap();
        assert_eq!(s.current_turn(), Some(p(1)));
        assert_eq!(s.phase(), Phase::TurnActive(TurnStep::DrawPending));

        s.draw(p(1), DrawSource::Deck).unwrap();
        s.discard(p(1), id(0, 1, 5)).unwrap();
        assert_eq!(s.current_turn(), Some(p(0)));
    }

    #[test]
    fn test_discard_requires_draw_first() {
        let mut s = scripted(vec![vec![id(0, 0, 5)], vec![id(0, 1, 5)]]);
        assert_eq!(
            s.discard(p(0), id(0, 0, 5)),
            Err(ActionError::MustDrawFirst)
        );
    }

    #[test]
    fn test_opening_gate() {
        // 7-7-7 (21) + 8-8-8 (24) = 45, under the line; 8-8-8 + 9-9-9
        // (27) = 51 exactly.
        let sevens = vec![id(0, 0, 7), id(0, 1, 7), id(0, 2, 7)];
        let eights = vec![id(0, 0, 8), id(0, 1, 8), id(0, 2, 8)];
        let nines = vec![id(0, 0, 9), id(0, 1, 9), id(0, 2, 9)];

        let mut hand = sevens.clone();
        hand.extend(eights.clone());
        hand.extend(nines.clone());
        hand.push(id(0, 3, 4)); // something to keep in hand
        let mut s = scripted(vec![hand, vec![id(1, 0, 5)]]);

        s.draw(p(0), DrawSource::Deck).unwrap();

        // 45 points: rejected outright, nothing moves.
        let err = s
            .meld(p(0), &[eights.clone(), sevens.clone()])
            .unwrap_err();
        assert_eq!(err, ActionError::OpeningTooLow { needed: 51, got: 45 });
        assert!(!s.players()[0].has_opened());
        assert_eq!(s.table().melds().len(), 0);
        assert!(s.players()[0].holds(id(0, 0, 8)));

        // 51 points in one call: accepted.
        s.meld(p(0), &[eights, nines]).unwrap();
        assert!(s.players()[0].has_opened());
        assert_eq!(s.players()[0].score, 51);
        assert_eq!(s.table().melds().len(), 2);

        // Once opened, smaller melds are fine.
        s.meld(p(0), &[sevens]).unwrap();
        assert_eq!(s.players()[0].score, 72);
        s.audit().unwrap();
    }

    #[test]
    fn test_meld_rejects_any_invalid_group() {
        let eights = vec![id(0, 0, 8), id(0, 1, 8), id(0, 2, 8)];
        let broken = vec![id(0, 0, 2), id(0, 1, 4), id(0, 2, 6)];
        let mut hand = eights.clone();
        hand.extend(broken.clone());
        let mut s = scripted(vec![hand, vec![id(1, 0, 5)]]);

        s.draw(p(0), DrawSource::Deck).unwrap();
        let err = s.meld(p(0), &[eights, broken]).unwrap_err();
        assert_eq!(err, ActionError::InvalidCombo(ComboError::NotACombination));
        assert_eq!(s.table().melds().len(), 0);
        assert!(!s.players()[0].has_opened());
    }

    #[test]
    fn test_meld_rejects_card_in_two_groups() {
        let mut s = scripted(vec![
            vec![id(0, 0, 8), id(0, 1, 8), id(0, 2, 8)],
            vec![id(1, 0, 5)],
        ]);
        s.draw(p(0), DrawSource::Deck).unwrap();

        let group = vec![id(0, 0, 8), id(0, 1, 8), id(0, 2, 8)];
        let err = s.meld(p(0), &[group.clone(), group]).unwrap_err();
        assert_eq!(err, ActionError::DuplicateCard(id(0, 0, 8)));
    }

    #[test]
    fn test_table_play_requires_opening() {
        let mut s = scripted(vec![
            vec![id(0, 0, 8), id(0, 1, 8), id(0, 2, 8)],
            vec![id(1, 0, 5)],
        ]);
        s.draw(p(0), DrawSource::Deck).unwrap();

        let err = s
            .extend(p(0), MeldId::new(0), &[id(0, 0, 8)])
            .unwrap_err();
        assert_eq!(err, ActionError::NotOpened { threshold: 51 });
        let err = s.steal(p(0), MeldId::new(0), id(0, 0, 8)).unwrap_err();
        assert_eq!(err, ActionError::NotOpened { threshold: 51 });
    }

    #[test]
    fn test_extend_and_steal_round_trip() {
        // Opening melds worth 69: Q-K-A hearts (30), 7-7-7 (21), and
        // 5♠-6♠-joker (18, the joker standing for the 7 of spades).
        let high_run = vec![id(0, 1, 12), id(0, 1, 13), id(0, 1, 1)];
        let sevens = vec![id(0, 0, 7), id(0, 1, 7), id(0, 2, 7)];
        let jrun = vec![id(0, 0, 5), id(0, 0, 6), CardId::new(104)];
        let jack_hearts = id(0, 1, 11);
        let seven_spades = id(1, 0, 7); // second-deck copy
        let mut hand = high_run.clone();
        hand.extend(sevens.clone());
        hand.extend(jrun.clone());
        hand.push(jack_hearts);
        hand.push(seven_spades);
        hand.push(id(0, 3, 2)); // keeper, so the hand never empties
        let mut s = scripted(vec![hand, vec![id(1, 2, 5)]]);

        s.draw(p(0), DrawSource::Deck).unwrap();
        s.meld(p(0), &[high_run, sevens, jrun]).unwrap();
        assert_eq!(s.players()[0].score, 69);

        // J♥ turns Q-K-A into J-Q-K-A (40); only the delta is credited.
        s.extend(p(0), MeldId::new(0), &[jack_hearts]).unwrap();
        assert_eq!(s.players()[0].score, 79);
        assert!(!s.players()[0].holds(jack_hearts));

        // The second-deck 7♠ takes the joker's seat in the run.
        s.steal(p(0), MeldId::new(2), seven_spades).unwrap();
        assert!(s.players()[0].hand.iter().any(Card::is_joker));
        assert!(!s.players()[0].holds(seven_spades));
        let jrun_meld = s.table().get(MeldId::new(2)).unwrap();
        assert!(jrun_meld.cards().all(|c| !c.is_joker()));
        s.audit().unwrap();
    }

    #[test]
    fn test_going_out_forfeits_unopened_players() {
        // Player 0 holds exactly two opening melds; drawing the seed
        // discard, melding everything, and discarding the seed empties the
        // hand in one turn.
        let eights = vec![id(0, 0, 8), id(0, 1, 8), id(0, 2, 8)];
        let nines = vec![id(0, 0, 9), id(0, 1, 9), id(0, 2, 9)];
        let mut hand = eights.clone();
        hand.extend(nines.clone());
        // Player 1 never opens; their hand value is irrelevant.
        let mut s = scripted(vec![hand, vec![id(0, 0, 13), CardId::new(105)]]);

        s.draw(p(0), DrawSource::Discard).unwrap();
        s.meld(p(0), &[eights, nines]).unwrap();
        let seed = s.players()[0].hand[0];
        let out = s.discard(p(0), seed.id).unwrap();

        assert_eq!(s.phase(), Phase::RoundEnd);
        assert!(s.players()[0].hand.is_empty());
        let round_end = out
            .iter()
            .find_map(|o| match &o.event {
                Event::RoundEnded { winner, settlement } => Some((winner, settlement)),
                _ => None,
            })
            .unwrap();
        assert_eq!(*round_end.0, Some(p(0)));
        assert_eq!(
            round_end.1,
            &vec![SettlementLine {
                player: p(1),
                penalty: 100,
            }]
        );

        // The finished round accepts no further play.
        assert_eq!(
            s.draw(p(1), DrawSource::Deck),
            Err(ActionError::RoundOver)
        );
        assert!(s
            .history()
            .iter()
            .any(|e| matches!(e, Event::RoundEnded { .. })));
        s.audit().unwrap();
    }

    #[test]
    fn test_settlement_charges_opened_players_their_hand_value() {
        // Both players open; player 1 is left holding a joker and a 5.
        let eights = vec![id(0, 0, 8), id(0, 1, 8), id(0, 2, 8)];
        let nines = vec![id(0, 0, 9), id(0, 1, 9), id(0, 2, 9)];
        let jacks = vec![id(1, 0, 11), id(1, 1, 11), id(1, 2, 11)];
        let kings = vec![id(1, 0, 13), id(1, 1, 13), id(1, 2, 13)];
        let mut hand0 = eights.clone();
        hand0.extend(nines.clone());
        let mut hand1 = jacks.clone();
        hand1.extend(kings.clone());
        hand1.push(CardId::new(105));
        hand1.push(id(0, 2, 5));
        let mut s = scripted(vec![hand0, hand1]);

        // Player 0 passes the first turn.
        s.draw(p(0), DrawSource::Deck).unwrap();
        let drawn = s.players()[0].hand.last().copied().unwrap();
        s.discard(p(0), drawn.id).unwrap();

        // Player 1 opens with 60 and keeps joker + 5♦.
        s.draw(p(1), DrawSource::Deck).unwrap();
        s.meld(p(1), &[jacks, kings]).unwrap();
        let drawn = s.players()[1].hand.last().copied().unwrap();
        s.discard(p(1), drawn.id).unwrap();
        assert_eq!(s.players()[1].hand.len(), 2);

        // Player 0 opens with everything and goes out.
        s.draw(p(0), DrawSource::Deck).unwrap();
        s.meld(p(0), &[eights, nines]).unwrap();
        let last = s.players()[0].hand[0];
        let out = s.discard(p(0), last.id).unwrap();

        let settlement = out
            .iter()
            .find_map(|o| match &o.event {
                Event::RoundEnded { settlement, .. } => Some(settlement),
                _ => None,
            })
            .unwrap();
        // Joker 25 + five 5.
        assert_eq!(
            settlement,
            &vec![SettlementLine {
                player: p(1),
                penalty: 30,
            }]
        );
    }

    #[test]
    fn test_deck_recycles_when_empty() {
        let mut s = scripted(vec![vec![id(0, 0, 5)], vec![id(0, 1, 5)]]);

        // Drain the deck into the discard pile by hand.
        while let Some(card) = s.draw_pile.draw() {
            s.discard.push(card);
        }
        assert_eq!(s.deck_count(), 0);
        let k = s.discard_count();
        assert!(k > 1);
        let top = s.discard.top().unwrap();

        s.draw(p(0), DrawSource::Deck).unwrap();
        assert_eq!(s.deck_count(), k - 2); // k-1 recycled, 1 drawn
        assert_eq!(s.discard_count(), 1);
        assert_eq!(s.discard.top(), Some(top));
        s.audit().unwrap();
    }

    #[test]
    fn test_draw_fails_when_nothing_to_recycle() {
        let mut s = scripted(vec![vec![id(0, 0, 5)], vec![id(0, 1, 5)]]);

        // Move the whole deck into player 0's hand, leaving 1 discard.
        while let Some(card) = s.draw_pile.draw() {
            s.players[0].hand.push(card);
        }
        s.audit().unwrap();

        assert_eq!(
            s.draw(p(0), DrawSource::Deck),
            Err(ActionError::OutOfCards)
        );
    }

    #[test]
    fn test_leave_mid_turn_advances_and_conserves() {
        let mut s = scripted(vec![
            vec![id(0, 0, 5), id(0, 0, 6)],
            vec![id(0, 1, 5), id(0, 1, 6)],
            vec![id(0, 2, 5), id(0, 2, 6)],
        ]);

        s.draw(p(0), DrawSource::Deck).unwrap();
        let out = s.leave(p(0)).unwrap();

        assert_eq!(s.players().len(), 2);
        assert_eq!(s.current_turn(), Some(p(1)));
        assert_eq!(s.phase(), Phase::TurnActive(TurnStep::DrawPending));
        assert!(out
            .iter()
            .any(|o| matches!(o.event, Event::RosterUpdated { .. })));
        s.audit().unwrap();
    }

    #[test]
    fn test_leave_to_single_player_abandons_round() {
        let mut s = scripted(vec![vec![id(0, 0, 5)], vec![id(0, 1, 5)]]);

        let out = s.leave(p(1)).unwrap();
        assert_eq!(s.phase(), Phase::RoundEnd);
        assert!(out.iter().any(|o| matches!(
            o.event,
            Event::RoundEnded { winner: None, .. }
        )));
        s.audit().unwrap();
    }

    #[test]
    fn test_snapshot_hides_other_hands() {
        let mut s = session();
        let (a, _) = s.join("amira").unwrap();
        let (b, _) = s.join("karim").unwrap();
        s.start(a).unwrap();

        let view = s.snapshot(Some(b));
        assert_eq!(view.your_hand.as_ref().map(Vec::len), Some(14));
        assert_eq!(view.current_turn, Some(a));

        let spectator = s.snapshot(None);
        assert!(spectator.your_hand.is_none());
        // Hand sizes are public; contents are not part of the snapshot.
        assert_eq!(spectator.players[0].hand_size, 15);
    }
}
