use serde::{Deserialize, Serialize};

/// Letter counts from A to Z
pub type LetterDistribution = [usize; 26];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TileDistribution {
    Standard,
    Custom(LetterDistribution),
}

impl TileDistribution {
    pub fn letter_counts(&self) -> LetterDistribution {
        match self {
            // bananagrams letter distribution, 144 tiles
            TileDistribution::Standard => [
                13, 3, 3, 6, 18, 3, 4, 3, 12, 2, 2, 5, 3, 8, 11, 3, 2, 9, 6, 9, 6, 3, 3, 2, 3, 2,
            ],
            TileDistribution::Custom(counts) => *counts,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRules {
    /// How many tiles each player is dealt when a round starts
    pub starting_tiles: usize,
    pub tile_distribution: TileDistribution,
    /// Fixes the shuffle of every round's bag, otherwise each round is seeded randomly
    pub tile_seed: Option<u64>,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            starting_tiles: 12,
            tile_distribution: TileDistribution::Standard,
            tile_seed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_distribution_has_144_tiles() {
        let counts = TileDistribution::Standard.letter_counts();
        assert_eq!(counts.iter().sum::<usize>(), 144);
        assert_eq!(counts[4], 18, "E is the most common letter");
        assert_eq!(counts[16], 2, "Two Qs");
    }
}
