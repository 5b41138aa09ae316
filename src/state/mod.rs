//! The round state machine: replays one round's decoded actions against
//! per-seat hand state, validating structural invariants as it goes.

use log::debug;

use crate::errors::{ensure_state, ReplayError, Result};
use crate::replay::{Action, NewRound};
use crate::tile::{Tile, TileBin, KITA};

pub mod hand;

pub use hand::{Meld, SeatHand};

/// Replays one round's actions, owning every seat's hand exclusively.
///
/// All errors are fatal for the round: this runs against years of archived
/// records, and a single misattributed action desynchronizes every
/// derived value after it, so the analyzer never guesses.
pub struct RoundAnalyzer {
    seats: Vec<SeatHand>,
    latest_doras: Vec<Tile>,
    /// The most recent discard (or kan/kita tile) still claimable by a call;
    /// cleared once claimed or once the next tile is dealt.
    pending_tile: Option<Tile>,
    /// Per-seat furiten flags as of the last discard event.
    furiten: Vec<bool>,
}

impl RoundAnalyzer {
    pub fn new(round: &NewRound) -> Result<Self> {
        ensure_state!(
            matches!(round.scores.len(), 3 | 4),
            "round must have 3 or 4 seats, got {}",
            round.scores.len()
        );
        ensure_state!(
            round.hands.len() == round.scores.len(),
            "{} starting hands for {} seats",
            round.hands.len(),
            round.scores.len()
        );
        let seats = round
            .hands
            .iter()
            .map(|hand| SeatHand::new(hand.clone()))
            .collect::<Result<Vec<_>>>()?;
        debug!("new round: {} seats, doras {:?}", seats.len(), round.doras);
        Ok(Self {
            furiten: vec![false; seats.len()],
            seats,
            latest_doras: round.doras.clone(),
            pending_tile: None,
        })
    }

    pub fn seats(&self) -> &[SeatHand] {
        &self.seats
    }

    pub fn furiten(&self) -> &[bool] {
        &self.furiten
    }

    pub fn pending_tile(&self) -> Option<Tile> {
        self.pending_tile
    }

    fn seat_mut(&mut self, seat: usize) -> Result<&mut SeatHand> {
        let total = self.seats.len();
        self.seats.get_mut(seat).ok_or_else(|| {
            ReplayError::StructuralInvariant(format!("seat {seat} out of range for {total} seats"))
        })
    }

    fn note_doras(&mut self, doras: &[Tile]) {
        if !doras.is_empty() {
            self.latest_doras = doras.to_vec();
        }
    }

    /// Applies one action. A `NewRound` mid-stream resets the analyzer for
    /// the next round of the same game.
    pub fn apply(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::NewRound(round) => {
                *self = Self::new(round)?;
            }
            Action::DealTile { seat, tile, doras } => {
                self.note_doras(doras);
                self.seat_mut(*seat)?.deal(*tile)?;
                self.pending_tile = None;
            }
            Action::DiscardTile {
                seat,
                tile,
                is_liqi,
                doras,
                tingpais,
                zhenting,
                ..
            } => {
                self.note_doras(doras);
                self.seat_mut(*seat)?.discard(*tile)?;
                self.pending_tile = Some(*tile);
                if zhenting.len() == self.seats.len() {
                    self.furiten.copy_from_slice(zhenting);
                }
                if !tingpais.is_empty() {
                    // The server says this discard left the seat tenpai;
                    // our replayed hand must agree or the stream is corrupt.
                    let hand = &self.seats[*seat];
                    ensure_state!(
                        hand.shanten()? == 0 || hand.is_kokushi_tenpai(),
                        "seat {seat} declared tenpai but replayed hand is not"
                    );
                }
                if *is_liqi {
                    ensure_state!(
                        zhenting.len() == self.seats.len(),
                        "riichi discard carries {} furiten flags for {} seats",
                        zhenting.len(),
                        self.seats.len()
                    );
                    let derived = self.seats[*seat]
                        .discards()
                        .iter()
                        .any(|d| tingpais.iter().any(|t| t.equivalent(*d)));
                    ensure_state!(
                        zhenting[*seat] == derived,
                        "seat {seat} furiten flag disagrees with its discard pile"
                    );
                    self.remaining_tiles(*seat, tingpais)?;
                }
            }
            Action::ChiPengGang { seat, tiles } => {
                let pending = self.pending_tile.ok_or_else(|| {
                    ReplayError::StructuralInvariant("call without a pending tile".to_owned())
                })?;
                ensure_state!(
                    tiles.len() >= 3,
                    "call with {} tiles",
                    tiles.len()
                );
                let mut tiles = tiles.clone();
                let idx = tiles.iter().position(|&t| t == pending).ok_or_else(|| {
                    ReplayError::StructuralInvariant(format!(
                        "called meld does not contain the pending tile {pending}"
                    ))
                })?;
                tiles.remove(idx);
                self.seat_mut(*seat)?.call_meld(pending, &tiles)?;
                self.pending_tile = None;
            }
            Action::BaBei { seat } => {
                self.seat_mut(*seat)?.kita()?;
                // A replacement draw follows; attribute it like a discard.
                self.pending_tile = Some(KITA);
            }
            Action::AnGangAddGang { seat, tile, doras } => {
                self.note_doras(doras);
                self.seat_mut(*seat)?.kan(*tile)?;
                self.pending_tile = Some(*tile);
            }
            // Terminal events carry no hand-state transition.
            Action::Hule { .. } | Action::NoTile { .. } | Action::LiuJu { .. } => {}
        }
        Ok(())
    }

    /// How many of the 4 physical copies of each target remain unseen from
    /// `seat`'s point of view, summed over `targets`.
    ///
    /// Visible means: every seat's discard pile, every exposed meld's
    /// hand tiles, the requesting seat's own concealed hand, and the current
    /// dora indicators. Called meld tiles stay counted through the
    /// discarder's pile, and other seats' concealed hands are never counted;
    /// the tally matches what the seat could actually know.
    pub fn remaining_tiles(&self, seat: usize, targets: &[Tile]) -> Result<u32> {
        ensure_state!(
            !self.latest_doras.is_empty() && self.latest_doras.len() <= 5,
            "{} dora indicators revealed",
            self.latest_doras.len()
        );
        let requester = self.seats.get(seat).ok_or_else(|| {
            ReplayError::StructuralInvariant(format!("seat {seat} out of range"))
        })?;
        let mut bin = TileBin::new();
        for hand in &self.seats {
            for &tile in hand.discards() {
                bin.put(tile)?;
            }
            for meld in hand.melds() {
                for &tile in &meld.tiles {
                    bin.put(tile)?;
                }
            }
        }
        for &tile in requester.concealed() {
            bin.put(tile)?;
        }
        for &tile in &self.latest_doras {
            bin.put(tile)?;
        }
        let mut remaining = 0;
        for &target in targets {
            remaining += u32::from(4 - bin.count(target));
        }
        Ok(remaining)
    }
}
