use crate::errors::{ensure_state, ReplayError, Result};
use crate::shanten::{calc_shanten, tiles_to_counts};
use crate::tile::{Tile, KITA};

/// An exposed meld. `tiles` are the copies taken from the concealed hand;
/// `called` is the claimed discard, if any. A closed kan has four hand tiles
/// and no call; a kita declaration has a single hand tile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Meld {
    pub tiles: Vec<Tile>,
    pub called: Option<Tile>,
}

/// One seat's tile state for the duration of a round.
///
/// Concealed-tile count stays congruent to 13 or 14 modulo meld consumption;
/// every operation checks the parity it requires before mutating, because a
/// parity mismatch means an upstream action was attributed to the wrong
/// round or seat.
#[derive(Clone, Debug, Default)]
pub struct SeatHand {
    concealed: Vec<Tile>,
    melds: Vec<Meld>,
    discards: Vec<Tile>,
}

impl SeatHand {
    pub fn new(dealt: Vec<Tile>) -> Result<Self> {
        ensure_state!(
            matches!(dealt.len(), 13 | 14),
            "starting hand must have 13 or 14 tiles, got {}",
            dealt.len()
        );
        Ok(Self {
            concealed: dealt,
            melds: Vec::new(),
            discards: Vec::new(),
        })
    }

    pub fn concealed(&self) -> &[Tile] {
        &self.concealed
    }

    pub fn melds(&self) -> &[Meld] {
        &self.melds
    }

    pub fn discards(&self) -> &[Tile] {
        &self.discards
    }

    /// Removes one exact-identity copy from the concealed tiles. Equivalence
    /// is deliberately not consulted: holding a plain five does not satisfy
    /// an action that names the red one.
    fn take_exact(&mut self, tile: Tile) -> Result<Tile> {
        match self.concealed.iter().position(|&t| t == tile) {
            Some(idx) => Ok(self.concealed.swap_remove(idx)),
            None => Err(ReplayError::NotInHand(tile.to_string())),
        }
    }

    fn take_equivalent(&mut self, tile: Tile) -> Result<Tile> {
        match self.concealed.iter().position(|&t| t.equivalent(tile)) {
            Some(idx) => Ok(self.concealed.swap_remove(idx)),
            None => Err(ReplayError::NotInHand(tile.to_string())),
        }
    }

    pub fn deal(&mut self, tile: Tile) -> Result<()> {
        ensure_state!(
            self.concealed.len() % 3 == 1,
            "deal on a hand of {} tiles",
            self.concealed.len()
        );
        self.concealed.push(tile);
        Ok(())
    }

    pub fn discard(&mut self, tile: Tile) -> Result<()> {
        ensure_state!(
            self.concealed.len() % 3 == 2,
            "discard on a hand of {} tiles",
            self.concealed.len()
        );
        self.take_exact(tile)?;
        self.discards.push(tile);
        Ok(())
    }

    /// The 4z bonus-tile declaration of 3-player games: a single concealed
    /// north becomes its own exposed meld.
    pub fn kita(&mut self) -> Result<()> {
        ensure_state!(
            self.concealed.len() % 3 == 2,
            "kita on a hand of {} tiles",
            self.concealed.len()
        );
        self.take_exact(KITA)?;
        self.melds.push(Meld {
            tiles: vec![KITA],
            called: None,
        });
        Ok(())
    }

    /// Claims another seat's discard together with 2 (chi/pon) or 3
    /// (open kan) exact-identity tiles from the concealed hand.
    pub fn call_meld(&mut self, called: Tile, hand_tiles: &[Tile]) -> Result<()> {
        ensure_state!(
            self.concealed.len() % 3 == 1,
            "call on a hand of {} tiles",
            self.concealed.len()
        );
        ensure_state!(
            matches!(hand_tiles.len(), 2 | 3),
            "call must take 2 or 3 hand tiles, got {}",
            hand_tiles.len()
        );
        for &tile in hand_tiles {
            self.take_exact(tile)?;
        }
        self.melds.push(Meld {
            tiles: hand_tiles.to_vec(),
            called: Some(called),
        });
        Ok(())
    }

    /// Added or closed kan. When a 2-tile called meld matches the target by
    /// equivalence, upgrading it always wins over forming a fresh closed kan;
    /// the two layouts can otherwise be ambiguous for red fives.
    pub fn kan(&mut self, tile: Tile) -> Result<()> {
        ensure_state!(
            self.concealed.len() % 3 == 2,
            "kan on a hand of {} tiles",
            self.concealed.len()
        );
        let upgradable = self.melds.iter_mut().find(|meld| {
            meld.tiles.len() == 2
                && meld
                    .called
                    .is_some_and(|called| called.equivalent(tile))
                && meld.tiles.iter().all(|t| t.equivalent(tile))
        });
        if let Some(meld) = upgradable {
            match self.concealed.iter().position(|&t| t == tile) {
                Some(idx) => {
                    self.concealed.swap_remove(idx);
                    meld.tiles.push(tile);
                }
                None => return Err(ReplayError::NotInHand(tile.to_string())),
            }
        } else {
            let mut tiles = Vec::with_capacity(4);
            for _ in 0..4 {
                tiles.push(self.take_equivalent(tile)?);
            }
            self.melds.push(Meld {
                tiles,
                called: None,
            });
        }
        Ok(())
    }

    /// Shanten of the concealed tiles, delegated to the count-array
    /// calculator. 0 means tenpai, -1 complete.
    pub fn shanten(&self) -> Result<i8> {
        Ok(calc_shanten(&tiles_to_counts(&self.concealed)?))
    }

    /// Independent thirteen-orphans tenpai test: 13 tiles, all of them
    /// terminals or honors, no type more than twice, at most one type twice.
    pub fn is_kokushi_tenpai(&self) -> bool {
        if self.concealed.len() != 13 {
            return false;
        }
        let mut counts = [0u8; 34];
        for tile in &self.concealed {
            if !tile.is_terminal_or_honor() {
                return false;
            }
            counts[tile.index34()] += 1;
            if counts[tile.index34()] > 2 {
                return false;
            }
        }
        counts.iter().filter(|&&n| n == 2).count() <= 1
    }
}
