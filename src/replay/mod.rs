//! Typed round actions and the JSON boundary that produces them.
//!
//! A round's record stream arrives as a list of `{name, data}` objects, the
//! shape the game server's protobuf wrapper decodes to. Everything is parsed
//! into the `Action` enum here, once, so the analyzer and the record builder
//! downstream dispatch on variants with compile-time exhaustiveness instead
//! of re-matching string tags.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::{ReplayError, Result};
use crate::tile::Tile;

/// One decoded action of a round's record stream.
#[derive(Clone, Debug)]
pub enum Action {
    NewRound(NewRound),
    DealTile {
        seat: usize,
        tile: Tile,
        doras: Vec<Tile>,
    },
    DiscardTile {
        seat: usize,
        tile: Tile,
        is_liqi: bool,
        is_wliqi: bool,
        doras: Vec<Tile>,
        /// Waits declared by the server for this seat after the discard.
        tingpais: Vec<Tile>,
        /// Per-seat furiten flags as of this discard.
        zhenting: Vec<bool>,
    },
    ChiPengGang {
        seat: usize,
        tiles: Vec<Tile>,
    },
    BaBei {
        seat: usize,
    },
    AnGangAddGang {
        seat: usize,
        tile: Tile,
        doras: Vec<Tile>,
    },
    Hule {
        hules: Vec<HuleData>,
        delta_scores: Vec<i32>,
    },
    NoTile {
        liujumanguan: bool,
        /// Tenpai flag per seat, in seat order.
        tenpai: Vec<bool>,
        /// Seats listed in the event's score entries.
        score_seats: Vec<usize>,
    },
    LiuJu {
        kind: u8,
    },
}

/// Initial state of a round: one starting hand per seat (14 tiles for the
/// dealer, 13 otherwise) and the revealed dora indicators.
#[derive(Clone, Debug)]
pub struct NewRound {
    pub scores: Vec<i32>,
    pub doras: Vec<Tile>,
    pub hands: Vec<Vec<Tile>>,
    /// The dealer's wall string as recorded by the server, passed through
    /// unparsed for archival.
    pub paishan: Option<String>,
}

/// One winning seat within a win event.
#[derive(Clone, Debug)]
pub struct HuleData {
    pub seat: usize,
    pub zimo: bool,
    /// Winner had declared riichi; their returned stick inflates the delta.
    pub liqi: bool,
    pub yiman: bool,
    pub point_rong: i32,
    /// Yaku ids, one entry per counted occurrence.
    pub fans: Vec<u32>,
}

/// Decodes a round's (or a whole game's) record list. Any record whose name
/// is not one of the nine known types fails the stream with `UnknownEvent`;
/// skipping it silently could drop scoring-relevant information.
pub fn decode_actions(raw: &str) -> Result<Vec<Action>> {
    let items: Vec<Value> = serde_json::from_str(raw)?;
    items.iter().map(decode_action).collect()
}

pub fn decode_action(value: &Value) -> Result<Action> {
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ReplayError::StructuralInvariant("record without a name tag".to_owned()))?;
    if !is_known_record(name) {
        return Err(ReplayError::UnknownEvent(name.to_owned()));
    }
    // Records written before the multi-dora upgrade carry a scalar `dora`
    // field instead of `doras`; treat them as corrupt rather than guessing.
    if value
        .get("data")
        .and_then(|data| data.get("dora"))
        .is_some()
    {
        return Err(ReplayError::StructuralInvariant(format!(
            "legacy dora field on {name}, may be old data"
        )));
    }
    let raw: RawAction = serde_json::from_value(value.clone())?;
    raw.into_action()
}

const KNOWN_RECORDS: [&str; 9] = [
    "NewRound",
    "DealTile",
    "DiscardTile",
    "ChiPengGang",
    "BaBei",
    "AnGangAddGang",
    "Hule",
    "NoTile",
    "LiuJu",
];

// Exactly the three spellings the decoder's aliases accept; anything else
// (e.g. ".lq.NewRound" with the Record segment missing) is unknown, not a
// decode failure.
fn is_known_record(name: &str) -> bool {
    let base = name
        .strip_prefix(".lq.Record")
        .or_else(|| name.strip_prefix("Record"))
        .unwrap_or(name);
    KNOWN_RECORDS.contains(&base)
}

#[derive(Deserialize)]
#[serde(tag = "name", content = "data")]
enum RawAction {
    #[serde(
        rename = ".lq.RecordNewRound",
        alias = "RecordNewRound",
        alias = "NewRound"
    )]
    NewRound {
        scores: Vec<i32>,
        #[serde(default)]
        doras: Option<Vec<String>>,
        #[serde(default)]
        paishan: Option<String>,
        #[serde(default)]
        tiles0: Vec<String>,
        #[serde(default)]
        tiles1: Vec<String>,
        #[serde(default)]
        tiles2: Vec<String>,
        #[serde(default)]
        tiles3: Vec<String>,
    },
    #[serde(
        rename = ".lq.RecordDealTile",
        alias = "RecordDealTile",
        alias = "DealTile"
    )]
    DealTile {
        seat: usize,
        tile: String,
        #[serde(default)]
        doras: Vec<String>,
    },
    #[serde(
        rename = ".lq.RecordDiscardTile",
        alias = "RecordDiscardTile",
        alias = "DiscardTile"
    )]
    DiscardTile {
        seat: usize,
        tile: String,
        #[serde(default)]
        is_liqi: bool,
        #[serde(default)]
        is_wliqi: bool,
        #[serde(default)]
        doras: Vec<String>,
        #[serde(default)]
        tingpais: Vec<RawTingpai>,
        #[serde(default)]
        zhenting: Vec<bool>,
    },
    #[serde(
        rename = ".lq.RecordChiPengGang",
        alias = "RecordChiPengGang",
        alias = "ChiPengGang"
    )]
    ChiPengGang { seat: usize, tiles: Vec<String> },
    #[serde(rename = ".lq.RecordBaBei", alias = "RecordBaBei", alias = "BaBei")]
    BaBei { seat: usize },
    #[serde(
        rename = ".lq.RecordAnGangAddGang",
        alias = "RecordAnGangAddGang",
        alias = "AnGangAddGang"
    )]
    AnGangAddGang {
        seat: usize,
        tiles: String,
        #[serde(default)]
        doras: Vec<String>,
    },
    #[serde(rename = ".lq.RecordHule", alias = "RecordHule", alias = "Hule")]
    Hule {
        hules: Vec<RawHule>,
        #[serde(default)]
        delta_scores: Vec<i32>,
    },
    #[serde(rename = ".lq.RecordNoTile", alias = "RecordNoTile", alias = "NoTile")]
    NoTile {
        #[serde(default)]
        liujumanguan: bool,
        #[serde(default)]
        players: Vec<RawNoTilePlayer>,
        #[serde(default)]
        scores: Vec<RawNoTileScore>,
    },
    #[serde(rename = ".lq.RecordLiuJu", alias = "RecordLiuJu", alias = "LiuJu")]
    LiuJu {
        #[serde(rename = "type", default)]
        kind: u8,
    },
}

#[derive(Deserialize)]
struct RawTingpai {
    tile: String,
}

#[derive(Deserialize)]
struct RawHule {
    seat: usize,
    #[serde(default)]
    zimo: bool,
    #[serde(default)]
    liqi: bool,
    #[serde(default)]
    yiman: bool,
    #[serde(default)]
    point_rong: i32,
    #[serde(default)]
    fans: Vec<RawFan>,
}

#[derive(Deserialize)]
struct RawFan {
    id: u32,
    #[serde(default)]
    val: u32,
}

#[derive(Deserialize)]
struct RawNoTilePlayer {
    #[serde(default)]
    tingpai: bool,
}

#[derive(Deserialize)]
struct RawNoTileScore {
    #[serde(default)]
    seat: usize,
}

fn parse_tiles(tiles: &[String]) -> Result<Vec<Tile>> {
    tiles.iter().map(|s| s.parse()).collect()
}

impl RawAction {
    fn into_action(self) -> Result<Action> {
        let action = match self {
            Self::NewRound {
                scores,
                doras,
                paishan,
                tiles0,
                tiles1,
                tiles2,
                tiles3,
            } => {
                if !matches!(scores.len(), 3 | 4) {
                    return Err(ReplayError::StructuralInvariant(format!(
                        "round must have 3 or 4 seats, got {}",
                        scores.len()
                    )));
                }
                let hands = [&tiles0, &tiles1, &tiles2, &tiles3][..scores.len()]
                    .iter()
                    .map(|tiles| parse_tiles(tiles))
                    .collect::<Result<Vec<_>>>()?;
                Action::NewRound(NewRound {
                    scores,
                    doras: parse_tiles(&doras.unwrap_or_default())?,
                    hands,
                    paishan,
                })
            }
            Self::DealTile { seat, tile, doras } => Action::DealTile {
                seat,
                tile: tile.parse()?,
                doras: parse_tiles(&doras)?,
            },
            Self::DiscardTile {
                seat,
                tile,
                is_liqi,
                is_wliqi,
                doras,
                tingpais,
                zhenting,
            } => Action::DiscardTile {
                seat,
                tile: tile.parse()?,
                is_liqi,
                is_wliqi,
                doras: parse_tiles(&doras)?,
                tingpais: tingpais
                    .iter()
                    .map(|t| t.tile.parse())
                    .collect::<Result<_>>()?,
                zhenting,
            },
            Self::ChiPengGang { seat, tiles } => Action::ChiPengGang {
                seat,
                tiles: parse_tiles(&tiles)?,
            },
            Self::BaBei { seat } => Action::BaBei { seat },
            Self::AnGangAddGang { seat, tiles, doras } => Action::AnGangAddGang {
                seat,
                tile: tiles.parse()?,
                doras: parse_tiles(&doras)?,
            },
            Self::Hule {
                hules,
                delta_scores,
            } => Action::Hule {
                hules: hules
                    .into_iter()
                    .map(|h| HuleData {
                        seat: h.seat,
                        zimo: h.zimo,
                        liqi: h.liqi,
                        yiman: h.yiman,
                        point_rong: h.point_rong,
                        fans: h
                            .fans
                            .iter()
                            .flat_map(|f| std::iter::repeat(f.id).take(f.val as usize))
                            .collect(),
                    })
                    .collect(),
                delta_scores,
            },
            Self::NoTile {
                liujumanguan,
                players,
                scores,
            } => Action::NoTile {
                liujumanguan,
                tenpai: players.iter().map(|p| p.tingpai).collect(),
                score_seats: scores.iter().map(|s| s.seat).collect(),
            },
            Self::LiuJu { kind } => Action::LiuJu { kind },
        };
        Ok(action)
    }
}
