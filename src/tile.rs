use std::fmt;
use std::str::FromStr;

use ahash::AHashMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::{ReplayError, Result};

/// Tile suits as they appear in Majsoul's textual encoding: three number
/// suits plus one honor group.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub enum Suit {
    Man,
    Pin,
    Sou,
    Honor,
}

impl Suit {
    const fn letter(self) -> char {
        match self {
            Self::Man => 'm',
            Self::Pin => 'p',
            Self::Sou => 's',
            Self::Honor => 'z',
        }
    }
}

/// A single tile, parsed once at the decoder boundary.
///
/// `rank` is 1-9 for number suits and 1-7 for honors. A red five is stored
/// as rank 5 with `red` set, and prints back as rank 0 (`"0p"`), matching
/// the wire encoding.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Tile {
    pub suit: Suit,
    pub rank: u8,
    pub red: bool,
}

/// The north wind, called out as a single-tile meld in 3-player games.
pub const KITA: Tile = Tile {
    suit: Suit::Honor,
    rank: 4,
    red: false,
};

impl Tile {
    /// Interchangeable for state tracking: identical, or a red five and a
    /// plain five of the same suit. Never used for hand-membership removal,
    /// which is exact-identity only.
    #[must_use]
    pub fn equivalent(self, other: Self) -> bool {
        if self == other {
            return true;
        }
        self.suit == other.suit && self.rank == 5 && other.rank == 5
    }

    /// The tile with the red marking erased; identity for everything that
    /// is not a red five.
    #[must_use]
    pub const fn normalized(self) -> Self {
        Self {
            suit: self.suit,
            rank: self.rank,
            red: false,
        }
    }

    #[must_use]
    pub const fn is_honor(self) -> bool {
        matches!(self.suit, Suit::Honor)
    }

    #[must_use]
    pub const fn is_terminal_or_honor(self) -> bool {
        self.is_honor() || self.rank == 1 || self.rank == 9
    }

    /// Index into the conventional 34-cell count array: man 0-8, pin 9-17,
    /// sou 18-26, honors 27-33.
    #[must_use]
    pub const fn index34(self) -> usize {
        let base = match self.suit {
            Suit::Man => 0,
            Suit::Pin => 9,
            Suit::Sou => 18,
            Suit::Honor => 27,
        };
        base + (self.rank as usize) - 1
    }
}

impl FromStr for Tile {
    type Err = ReplayError;

    fn from_str(s: &str) -> Result<Self> {
        let bytes = s.as_bytes();
        if bytes.len() != 2 {
            return Err(ReplayError::InvalidTile(s.to_owned()));
        }
        let digit = (bytes[0] as char).to_digit(10);
        let (suit, rank) = match (digit, bytes[1]) {
            (Some(n), b'm') => (Suit::Man, n),
            (Some(n), b'p') => (Suit::Pin, n),
            (Some(n), b's') => (Suit::Sou, n),
            (Some(n @ 1..=7), b'z') => (Suit::Honor, n),
            _ => return Err(ReplayError::InvalidTile(s.to_owned())),
        };
        // Rank 0 in a number suit denotes the red five.
        if rank == 0 {
            Ok(Self {
                suit,
                rank: 5,
                red: true,
            })
        } else {
            Ok(Self {
                suit,
                rank: rank as u8,
                red: false,
            })
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shown = if self.red { 0 } else { self.rank };
        write!(f, "{}{}", shown, self.suit.letter())
    }
}

impl fmt::Debug for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<'de> Deserialize<'de> for Tile {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

impl Serialize for Tile {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Tally of visible tile copies, red fives normalized to their plain rank.
///
/// The tally ever exceeding the 4 physical copies of an identity means the
/// input stream is corrupt, so `put` reports it as a structural violation
/// rather than clamping.
#[derive(Default, Debug)]
pub struct TileBin {
    tiles: AHashMap<Tile, u8>,
}

impl TileBin {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, tile: Tile) -> Result<()> {
        let entry = self.tiles.entry(tile.normalized()).or_insert(0);
        *entry += 1;
        if *entry > 4 {
            return Err(ReplayError::StructuralInvariant(format!(
                "more than 4 copies of {} visible",
                tile.normalized()
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn count(&self, tile: Tile) -> u8 {
        self.tiles.get(&tile.normalized()).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse() {
        "5m".parse::<Tile>().unwrap();
        let red: Tile = "0p".parse().unwrap();
        assert!(red.red);
        assert_eq!(red.rank, 5);
        "7z".parse::<Tile>().unwrap();

        "8z".parse::<Tile>().unwrap_err();
        "0z".parse::<Tile>().unwrap_err();
        "xx".parse::<Tile>().unwrap_err();
        "".parse::<Tile>().unwrap_err();
        "10m".parse::<Tile>().unwrap_err();
    }

    #[test]
    fn display_round_trip() {
        for s in ["1m", "9m", "0p", "5p", "3s", "1z", "7z"] {
            let tile: Tile = s.parse().unwrap();
            assert_eq!(tile.to_string(), s);
        }
    }

    #[test]
    fn equivalence() {
        let t = |s: &str| s.parse::<Tile>().unwrap();
        assert!(t("0p").equivalent(t("5p")));
        assert!(t("5p").equivalent(t("0p")));
        assert!(t("5m").equivalent(t("5m")));
        assert!(!t("0p").equivalent(t("0s")));
        assert!(!t("4p").equivalent(t("5p")));
        assert!(!t("5p").equivalent(t("5s")));
    }

    #[test]
    fn bin_overflow() {
        let mut bin = TileBin::new();
        let five: Tile = "5p".parse().unwrap();
        let red: Tile = "0p".parse().unwrap();
        bin.put(five).unwrap();
        bin.put(five).unwrap();
        bin.put(five).unwrap();
        bin.put(red).unwrap();
        assert_eq!(bin.count(red), 4);
        // The fifth copy of an identity is physically impossible.
        bin.put(five).unwrap_err();
    }
}
