//! Distance-to-completion calculator over the conventional 34-cell count
//! array. Returns 0 for tenpai and -1 for a complete hand.

use crate::errors::{ReplayError, Result};
use crate::tile::Tile;

const ORPHAN_INDICES: [usize; 13] = [0, 8, 9, 17, 18, 26, 27, 28, 29, 30, 31, 32, 33];

/// Minimum over the standard form, seven pairs, and thirteen orphans.
#[must_use]
pub fn calc_shanten(counts: &[u8; 34]) -> i8 {
    standard_shanten(counts)
        .min(seven_pairs_shanten(counts))
        .min(kokushi_shanten(counts))
}

/// Builds the count array for a concealed hand, red fives normalized.
/// More than 4 copies of one identity is a corruption signal.
pub fn tiles_to_counts(tiles: &[Tile]) -> Result<[u8; 34]> {
    let mut counts = [0u8; 34];
    for tile in tiles {
        let idx = tile.index34();
        counts[idx] += 1;
        if counts[idx] > 4 {
            return Err(ReplayError::StructuralInvariant(format!(
                "more than 4 copies of {} in one hand",
                tile.normalized()
            )));
        }
    }
    Ok(counts)
}

fn standard_shanten(counts: &[u8; 34]) -> i8 {
    let mut c = *counts;
    let mut best = 8;
    decompose(&mut c, 0, 0, 0, false, &mut best);
    best
}

/// Exhaustive decomposition into melds, partial melds and a pair, keeping
/// the best `8 - 2*melds - partials - pair` over all extraction orders.
/// Blocks beyond melds + partials = 4 cannot contribute.
fn decompose(c: &mut [u8; 34], idx: usize, melds: u8, partials: u8, has_pair: bool, best: &mut i8) {
    let mut i = idx;
    while i < 34 && c[i] == 0 {
        i += 1;
    }
    if i == 34 {
        let usable = partials.min(4 - melds.min(4));
        let shanten =
            8 - 2 * (melds.min(4) as i8) - (usable as i8) - i8::from(has_pair);
        *best = (*best).min(shanten);
        return;
    }

    let suited = i < 27;
    let pos = i % 9;

    if c[i] >= 3 {
        c[i] -= 3;
        decompose(c, i, melds + 1, partials, has_pair, best);
        c[i] += 3;
    }
    if suited && pos <= 6 && c[i + 1] > 0 && c[i + 2] > 0 {
        c[i] -= 1;
        c[i + 1] -= 1;
        c[i + 2] -= 1;
        decompose(c, i, melds + 1, partials, has_pair, best);
        c[i] += 1;
        c[i + 1] += 1;
        c[i + 2] += 1;
    }
    if !has_pair && c[i] >= 2 {
        c[i] -= 2;
        decompose(c, i, melds, partials, true, best);
        c[i] += 2;
    }
    if melds + partials < 4 {
        if c[i] >= 2 {
            c[i] -= 2;
            decompose(c, i, melds, partials + 1, has_pair, best);
            c[i] += 2;
        }
        if suited && pos <= 7 && c[i + 1] > 0 {
            c[i] -= 1;
            c[i + 1] -= 1;
            decompose(c, i, melds, partials + 1, has_pair, best);
            c[i] += 1;
            c[i + 1] += 1;
        }
        if suited && pos <= 6 && c[i + 2] > 0 {
            c[i] -= 1;
            c[i + 2] -= 1;
            decompose(c, i, melds, partials + 1, has_pair, best);
            c[i] += 1;
            c[i + 2] += 1;
        }
    }
    // The tile stays a floater.
    c[i] -= 1;
    decompose(c, i, melds, partials, has_pair, best);
    c[i] += 1;
}

fn seven_pairs_shanten(counts: &[u8; 34]) -> i8 {
    let mut pairs = 0i8;
    let mut kinds = 0i8;
    for &n in counts {
        if n > 0 {
            kinds += 1;
        }
        if n >= 2 {
            pairs += 1;
        }
    }
    6 - pairs + (7 - kinds).max(0)
}

fn kokushi_shanten(counts: &[u8; 34]) -> i8 {
    let mut kinds = 0i8;
    let mut has_pair = false;
    for &idx in &ORPHAN_INDICES {
        if counts[idx] > 0 {
            kinds += 1;
            if counts[idx] >= 2 {
                has_pair = true;
            }
        }
    }
    13 - kinds - i8::from(has_pair)
}

#[cfg(test)]
mod test {
    use super::*;

    fn counts(notation: &str) -> [u8; 34] {
        let mut ret = [0u8; 34];
        let mut digits: Vec<u32> = Vec::new();
        for ch in notation.chars() {
            if let Some(d) = ch.to_digit(10) {
                digits.push(d);
            } else if !ch.is_whitespace() {
                let base = match ch {
                    'm' => 0,
                    'p' => 9,
                    's' => 18,
                    'z' => 27,
                    _ => panic!("bad suit {ch}"),
                };
                for d in digits.drain(..) {
                    let d = if d == 0 { 5 } else { d };
                    ret[base + d as usize - 1] += 1;
                }
            }
        }
        ret
    }

    #[test]
    fn standard_hands() {
        assert_eq!(calc_shanten(&counts("33m 5555p 66s 556666z")), 1);
        assert_eq!(calc_shanten(&counts("13579m 13579s 135p")), 4);
        assert_eq!(calc_shanten(&counts("13579m 12379s 135p")), 3);
        assert_eq!(calc_shanten(&counts("123456789m 147s 14m")), 1);
        assert_eq!(calc_shanten(&counts("123456789m 147s 1m")), 2);
        assert_eq!(calc_shanten(&counts("258m 258s 258p 12345z")), 6);
        assert_eq!(calc_shanten(&counts("123456789m 1134p")), 0);
        assert_eq!(calc_shanten(&counts("123456789m 11345p")), -1);
    }

    #[test]
    fn honor_hands() {
        assert_eq!(calc_shanten(&counts("11223344556677z")), -1);
        assert_eq!(calc_shanten(&counts("1223344556677z")), 0);
        assert_eq!(calc_shanten(&counts("1m 1223344556677z")), 0);
        assert_eq!(calc_shanten(&counts("12m 123344556677z")), 1);
        assert_eq!(calc_shanten(&counts("1m 123344556677z")), 1);
        assert_eq!(calc_shanten(&counts("11222233445566z")), 1);
    }

    #[test]
    fn red_five_counts_as_plain() {
        // 0p normalizes onto the 5p cell.
        assert_eq!(calc_shanten(&counts("123456789m 11340p")), -1);
    }

    #[test]
    fn overflow_rejected() {
        let tiles: Vec<crate::tile::Tile> = ["5p", "5p", "5p", "5p", "0p"]
            .iter()
            .map(|s| s.parse().unwrap())
            .collect();
        tiles_to_counts(&tiles).unwrap_err();
    }
}
