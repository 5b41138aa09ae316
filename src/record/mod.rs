//! Builds the persisted per-seat round records: the second, independent
//! consumer of a round's action stream. The analyzer validates hand state;
//! this module accumulates what the statistics layer stores.

use log::{debug, info};
use serde::Serialize;

use crate::errors::{ensure_state, ReplayError, Result};
use crate::replay::{Action, NewRound};
use crate::shanten::{calc_shanten, tiles_to_counts};
use crate::tile::Tile;

/// A win as persisted: net score delta (riichi-stick refund excluded), the
/// flattened yaku-id list, and the 1-based turn of the win. Turns are
/// fractional (`discards / seats + 1`) so concurrent declarations in the
/// same go-around still order correctly.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WinRecord {
    pub delta: i32,
    pub yaku: Vec<u32>,
    pub turn: f64,
}

/// One seat's accumulated record for one round. Immutable once the round's
/// action list has been fully consumed; the persistence layer owns it from
/// there.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SeatRecord {
    pub dealer: bool,
    /// The dealt hand, stored verbatim alongside the values derived from it.
    pub starting_hand: Vec<Tile>,
    pub starting_shanten: i8,
    /// The server's wall string, archived on the dealer's record only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wall: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub riichi_turn: Option<f64>,
    pub riichi_furiten: bool,
    pub double_riichi: bool,
    pub num_melds: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub win: Option<WinRecord>,
    pub tsumo: bool,
    pub tsumo_furiten: bool,
    /// Amount paid for discarding into a win.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_in: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deal_in_turn: Option<f64>,
    /// Amount paid as a non-discarding payer: multi-ron side payment,
    /// yakuman liability, or a single-liable-seat self-draw.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub liability: Option<i32>,
    /// Tenpai at the exhaustive draw; absent if the round ended otherwise.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exhaustive_tenpai: Option<bool>,
    pub nagashi_mangan: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub abort_kind: Option<u8>,
}

/// Accumulates `SeatRecord`s for one round.
pub struct RecordBuilder {
    records: Vec<SeatRecord>,
    /// Per-seat furiten flags from the most recent discard.
    furiten: Vec<bool>,
    num_discarded: u32,
    last_discard_seat: Option<usize>,
}

impl RecordBuilder {
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
        let records = round
            .hands
            .iter()
            .map(|hand| {
                Ok(SeatRecord {
                    dealer: hand.len() == 14,
                    starting_hand: hand.clone(),
                    starting_shanten: calc_shanten(&tiles_to_counts(hand)?),
                    wall: if hand.len() == 14 {
                        round.paishan.clone()
                    } else {
                        None
                    },
                    ..SeatRecord::default()
                })
            })
            .collect::<Result<Vec<SeatRecord>>>()?;
        ensure_state!(
            records.iter().filter(|r| r.dealer).count() == 1,
            "round must have exactly one dealer"
        );
        Ok(Self {
            furiten: vec![false; records.len()],
            records,
            num_discarded: 0,
            last_discard_seat: None,
        })
    }

    fn num_seats(&self) -> usize {
        self.records.len()
    }

    /// 1-based, fractional within a go-around.
    fn turn(&self) -> f64 {
        f64::from(self.num_discarded) / self.num_seats() as f64 + 1.0
    }

    fn record_mut(&mut self, seat: usize) -> Result<&mut SeatRecord> {
        let total = self.records.len();
        self.records.get_mut(seat).ok_or_else(|| {
            ReplayError::StructuralInvariant(format!("seat {seat} out of range for {total} seats"))
        })
    }

    pub fn apply(&mut self, action: &Action) -> Result<()> {
        match action {
            Action::NewRound(round) => {
                *self = Self::new(round)?;
            }
            Action::DealTile { .. } => {}
            Action::DiscardTile {
                seat,
                is_liqi,
                is_wliqi,
                zhenting,
                ..
            } => {
                self.last_discard_seat = Some(*seat);
                if zhenting.len() == self.num_seats() {
                    self.furiten.copy_from_slice(zhenting);
                }
                let turn = self.turn();
                let furiten = self.furiten.get(*seat).copied().unwrap_or(false);
                let record = self.record_mut(*seat)?;
                if record.riichi_turn.is_none() && (*is_liqi || *is_wliqi) {
                    record.riichi_turn = Some(turn);
                    if furiten {
                        record.riichi_furiten = true;
                    }
                }
                if *is_wliqi {
                    record.double_riichi = true;
                }
                self.num_discarded += 1;
            }
            Action::ChiPengGang { seat, .. } => {
                self.record_mut(*seat)?.num_melds += 1;
            }
            Action::BaBei { seat } | Action::AnGangAddGang { seat, .. } => {
                self.last_discard_seat = Some(*seat);
            }
            Action::Hule {
                hules,
                delta_scores,
            } => self.apply_hule(hules, delta_scores)?,
            Action::NoTile {
                liujumanguan,
                tenpai,
                score_seats,
            } => {
                ensure_state!(
                    tenpai.len() == self.num_seats(),
                    "exhaustive draw reports {} tenpai flags for {} seats",
                    tenpai.len(),
                    self.num_seats()
                );
                if *liujumanguan {
                    for &seat in score_seats {
                        self.record_mut(seat)?.nagashi_mangan = true;
                    }
                }
                for (seat, &flag) in tenpai.iter().enumerate() {
                    self.records[seat].exhaustive_tenpai = Some(flag);
                }
            }
            Action::LiuJu { kind } => {
                for record in &mut self.records {
                    record.abort_kind = Some(*kind);
                }
            }
        }
        Ok(())
    }

    fn apply_hule(&mut self, hules: &[crate::replay::HuleData], delta_scores: &[i32]) -> Result<()> {
        ensure_state!(
            delta_scores.len() == self.num_seats(),
            "win event reports {} score deltas for {} seats",
            delta_scores.len(),
            self.num_seats()
        );
        let num_losing = delta_scores.iter().filter(|&&d| d < 0).count();
        let turn = self.turn();
        for hule in hules {
            ensure_state!(
                hule.seat < self.num_seats(),
                "winning seat {} out of range",
                hule.seat
            );
            let mut delta = delta_scores[hule.seat] - if hule.liqi { 1000 } else { 0 };

            if !hule.zimo && delta < (hule.point_rong - 1500).max(0) {
                // The delta fell short of a direct deal-in payment, so a
                // concurrent yakuman's liability rule redistributed it:
                // this winner also owes half the other winner's payment.
                ensure_state!(
                    hules.len() == 2,
                    "liability shortfall with {} concurrent winners",
                    hules.len()
                );
                let other = hules
                    .iter()
                    .find(|other| other.yiman && other.seat != hule.seat)
                    .ok_or_else(|| {
                        ReplayError::StructuralInvariant(
                            "liability shortfall without a concurrent yakuman winner".to_owned(),
                        )
                    })?;
                info!(
                    "seat {} pays half of seat {}'s yakuman ({})",
                    hule.seat,
                    other.seat,
                    other.point_rong / 2
                );
                delta += other.point_rong / 2;
                self.records[hule.seat].liability = Some(other.point_rong / 2);
            }

            self.records[hule.seat].win = Some(WinRecord {
                delta,
                yaku: hule.fans.clone(),
                turn,
            });

            if hule.zimo {
                ensure_state!(hules.len() == 1, "self-draw win with concurrent winners");
                ensure_state!(
                    num_losing == self.num_seats() - 1 || hules[0].yiman,
                    "self-draw win with {num_losing} paying seats"
                );
                self.records[hule.seat].tsumo = true;
                if self.furiten[hule.seat] {
                    self.records[hule.seat].tsumo_furiten = true;
                }
                if num_losing == 1 {
                    // Single-liable-seat self-draw: one seat covers the
                    // whole payment instead of the usual fan-out.
                    for (seat, &score) in delta_scores.iter().enumerate() {
                        if score < 0 {
                            self.records[seat].liability = Some(score.abs());
                        }
                    }
                }
            } else {
                ensure_state!(
                    matches!(num_losing, 1 | 2),
                    "discard win with {num_losing} paying seats"
                );
                for (seat, &score) in delta_scores.iter().enumerate() {
                    if score >= 0 {
                        continue;
                    }
                    if num_losing == 1 {
                        ensure_state!(
                            self.last_discard_seat == Some(seat),
                            "paying seat {seat} did not make the last discard"
                        );
                    } else {
                        ensure_state!(
                            hules.iter().any(|h| h.yiman),
                            "two paying seats without a yakuman winner"
                        );
                    }
                    if self.last_discard_seat == Some(seat) {
                        self.records[seat].deal_in = Some(score.abs());
                        self.records[seat].deal_in_turn = Some(turn);
                    } else if self.records[seat].liability.is_none() {
                        // Already set when this seat is itself a winner that
                        // covered half of the yakuman above; keep the gross
                        // amount rather than the netted delta.
                        self.records[seat].liability = Some(score.abs());
                    }
                }
            }
        }
        Ok(())
    }

    pub fn finish(self) -> Vec<SeatRecord> {
        self.records
    }
}

/// The per-game record: one `Vec<SeatRecord>` per round plus the per-seat
/// maximum dealer-repeat streak across the game.
#[derive(Clone, Debug, Serialize)]
pub struct GameRecord {
    pub rounds: Vec<Vec<SeatRecord>>,
    pub max_dealer_streak: Vec<u32>,
}

/// Replays one game's flat record stream, in which each `NewRound` opens a
/// new round. The analyzer and the builder consume the same actions but
/// keep separate state; the analyzer is there purely to fail the game on
/// corrupt input before a bad record is emitted.
#[derive(Default)]
pub struct GameProcessor {
    current: Option<(crate::state::RoundAnalyzer, RecordBuilder)>,
    rounds: Vec<Vec<SeatRecord>>,
}

impl GameProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, action: &Action) -> Result<()> {
        if let Action::NewRound(round) = action {
            self.flush();
            debug!("round {} begins", self.rounds.len() + 1);
            self.current = Some((
                crate::state::RoundAnalyzer::new(round)?,
                RecordBuilder::new(round)?,
            ));
            return Ok(());
        }
        let (analyzer, builder) = self.current.as_mut().ok_or_else(|| {
            ReplayError::StructuralInvariant("action before any NewRound".to_owned())
        })?;
        analyzer.apply(action)?;
        builder.apply(action)?;
        Ok(())
    }

    fn flush(&mut self) {
        if let Some((_, builder)) = self.current.take() {
            self.rounds.push(builder.finish());
        }
    }

    pub fn finish(mut self) -> GameRecord {
        self.flush();
        let max_dealer_streak = max_dealer_streaks(&self.rounds);
        GameRecord {
            rounds: self.rounds,
            max_dealer_streak,
        }
    }
}

/// Processes a fully materialized game stream. Fails at the first corrupt
/// action; the caller decides whether to quarantine or escalate.
pub fn process_game(actions: &[Action]) -> Result<GameRecord> {
    let mut processor = GameProcessor::new();
    for action in actions {
        processor.apply(action)?;
    }
    Ok(processor.finish())
}

/// A streak counts consecutive repeats: a seat dealing rounds 1-3 has a
/// streak of 2.
fn max_dealer_streaks(rounds: &[Vec<SeatRecord>]) -> Vec<u32> {
    let num_seats = rounds.first().map_or(0, Vec::len);
    let mut maxes = vec![0u32; num_seats];
    let mut streaks = vec![0u32; num_seats];
    for (i, round) in rounds.iter().enumerate() {
        for seat in 0..num_seats {
            let repeated = i > 0
                && round.get(seat).is_some_and(|r| r.dealer)
                && rounds[i - 1].get(seat).is_some_and(|r| r.dealer);
            if repeated {
                streaks[seat] += 1;
                maxes[seat] = maxes[seat].max(streaks[seat]);
            } else {
                streaks[seat] = 0;
            }
        }
    }
    maxes
}
