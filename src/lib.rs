//! Replay core for archived Majsoul round records.
//!
//! The crate consumes one round's (or one game's) ordered action stream and
//! derives the per-seat statistical record that the surrounding ETL persists:
//! hand state is replayed and validated by [`state::RoundAnalyzer`], the
//! persisted record is accumulated by [`record::RecordBuilder`], and
//! [`record::GameProcessor`] drives both over a whole game. All errors are
//! round-scoped and fatal; orchestration, storage and aggregation live
//! outside this crate.

pub mod errors;
pub mod record;
pub mod replay;
pub mod shanten;
pub mod state;
pub mod tile;


pub use errors::{ReplayError, Result};
pub use record::{process_game, GameProcessor, GameRecord, RecordBuilder, SeatRecord, WinRecord};
pub use replay::{decode_actions, Action, HuleData, NewRound};
pub use state::{RoundAnalyzer, SeatHand};
pub use tile::{Tile, TileBin};
