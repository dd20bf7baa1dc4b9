use oorandom::Rand32;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rules::{self, LetterDistribution};

/// Scrabble point values from A to Z
pub const LETTER_POINTS: [u32; 26] = [
    1, 3, 3, 2, 1, 4, 2, 4, 1, 8, 5, 1, 3, 1, 1, 3, 10, 1, 1, 1, 1, 4, 4, 8, 4, 10,
];

/// Points for an uppercase letter, anything else is worth nothing
pub fn points_for(letter: char) -> u32 {
    if letter.is_ascii_uppercase() {
        LETTER_POINTS[(letter as u8 - b'A') as usize]
    } else {
        0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tile {
    #[serde(rename = "Value")]
    pub value: char,
    #[serde(rename = "Points")]
    pub points: u32,
}

impl Tile {
    pub fn new(value: char) -> Self {
        Self {
            value,
            points: points_for(value),
        }
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.value, self.points)
    }
}

/// The full, shuffled run of tiles for one round.
///
/// Players never draw from the bag directly. Each keeps a cursor into it and is
/// served `bag[cursor]` on request, so a bag is never mutated once built and can
/// be shared between every player in the round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBag {
    bag: Vec<Tile>,
}

impl TileBag {
    pub fn new(tile_distribution: &rules::TileDistribution, seed: u64) -> Self {
        Self::custom(tile_distribution.letter_counts(), seed)
    }

    pub fn custom(letter_distribution: LetterDistribution, seed: u64) -> Self {
        let mut bag: Vec<Tile> = letter_distribution
            .iter()
            .enumerate()
            .flat_map(|(letter, count)| {
                std::iter::repeat(Tile::new((b'A' + letter as u8) as char)).take(*count)
            })
            .collect();

        // Fisher-Yates
        let mut rng = Rand32::new(seed);
        for i in (1..bag.len()).rev() {
            let j = rng.rand_range(0..(i as u32 + 1)) as usize;
            bag.swap(i, j);
        }

        TileBag { bag }
    }

    /// A bag holding exactly these tiles, in this order
    pub fn explicit(tiles: Vec<Tile>) -> Self {
        TileBag { bag: tiles }
    }

    pub fn get(&self, index: usize) -> Option<&Tile> {
        self.bag.get(index)
    }

    pub fn len(&self) -> usize {
        self.bag.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bag.is_empty()
    }

    /// The first `count` tiles of the bag, or all of them if the bag is shorter
    pub fn served(&self, count: usize) -> &[Tile] {
        &self.bag[..count.min(self.bag.len())]
    }
}

impl Default for TileBag {
    fn default() -> Self {
        Self::new(&rules::TileDistribution::Standard, 0)
    }
}

impl fmt::Display for TileBag {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Letters in the bag:\n{:?}",
            self.bag.iter().map(|t| t.value).collect::<Vec<_>>()
        )
    }
}
