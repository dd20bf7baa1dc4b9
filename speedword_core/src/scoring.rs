use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::bag::Tile;
use crate::board::{Board, Coordinate, Direction, TileSet};
use crate::judge::Judge;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreKind {
    Score,
    /// The board held tiles the player was never served
    Error,
}

/// A maximal horizontal or vertical run of two or more tiles
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Word {
    pub start: Coordinate,
    pub end: Coordinate,
    pub value: String,
    pub valid: bool,
    pub tiles: TileSet,
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} from {} to {}", self.value, self.start, self.end)
    }
}

/// The verdict on one submitted board.
///
/// `pts` is the penalty: the points of every served tile that didn't make it
/// into the best scoring group of words. A board wins when nothing is left over.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub win: bool,
    pub pts: u32,
    pub valid: TileSet,
    pub invalid: TileSet,
    pub unconnected: TileSet,
    pub words: Vec<Word>,
    pub nonwords: Vec<Word>,
    pub msg: ScoreKind,
}

impl Score {
    pub fn cheated(max_pts: u32) -> Self {
        Self {
            win: false,
            pts: max_pts,
            valid: TileSet::new(),
            invalid: TileSet::new(),
            unconnected: TileSet::new(),
            words: vec![],
            nonwords: vec![],
            msg: ScoreKind::Error,
        }
    }

    pub fn is_cheat(&self) -> bool {
        self.msg == ScoreKind::Error
    }

    /// Positions the player should be told to fix, in reading order
    pub fn flagged(&self) -> Vec<Coordinate> {
        let mut flagged: Vec<_> = self
            .invalid
            .coordinates()
            .chain(self.unconnected.coordinates())
            .collect();
        flagged.sort();
        flagged.dedup();
        flagged
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match (self.msg, self.win) {
            (ScoreKind::Error, _) => write!(f, "Rejected board, {} points", self.pts),
            (ScoreKind::Score, true) => write!(f, "Winning board"),
            (ScoreKind::Score, false) => write!(
                f,
                "{} points short with {} invalid and {} unconnected tiles",
                self.pts,
                self.invalid.len(),
                self.unconnected.len()
            ),
        }
    }
}

/// Intermediate result for a set of tiles, before the penalty is worked out
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Scorable {
    pub valid: TileSet,
    pub invalid: TileSet,
    pub unconnected: TileSet,
    pub words: Vec<Word>,
    pub nonwords: Vec<Word>,
}

impl Scorable {
    pub fn score(&self) -> u32 {
        self.valid.points()
    }
}

/// Scores a board against the tiles the player has been served so far.
pub fn score_board(board: &Board, served: &[Tile], judge: &Judge) -> Score {
    let placed = board.tile_set();
    let max_pts: u32 = served.iter().map(|tile| tile.points).sum();

    if !within_served(&placed, served) {
        tracing::warn!(
            "Board of {} tiles doesn't fit within the {} served",
            placed.len(),
            served.len()
        );
        return Score::cheated(max_pts);
    }

    let solution = solve(&placed, judge);
    let pts = max_pts.saturating_sub(solution.score());
    let win = pts == 0 && placed.len() == served.len() && solution.nonwords.is_empty();
    tracing::debug!("Best group scores {} of {max_pts}", solution.score());

    Score {
        win,
        pts,
        valid: solution.valid,
        invalid: solution.invalid,
        unconnected: solution.unconnected,
        words: solution.words,
        nonwords: solution.nonwords,
        msg: ScoreKind::Score,
    }
}

/// Placed letters must be a sub-multiset of the served letters
fn within_served(placed: &TileSet, served: &[Tile]) -> bool {
    if placed.len() > served.len() {
        return false;
    }

    let mut remaining: HashMap<char, usize> = HashMap::new();
    for tile in served {
        *remaining.entry(tile.value).or_default() += 1;
    }
    for (_, tile) in placed {
        match remaining.get_mut(&tile.value) {
            Some(count) if *count > 0 => *count -= 1,
            _ => return false,
        }
    }

    true
}

/// Scores every connected group in `tiles` and keeps the best one. Tiles of
/// the groups that lose out are reported as unconnected.
pub fn solve(tiles: &TileSet, judge: &Judge) -> Scorable {
    let scorables = tiles
        .components()
        .iter()
        .map(|component| score_component(component, judge))
        .collect();
    combine(scorables)
}

fn combine(mut scorables: Vec<Scorable>) -> Scorable {
    if scorables.is_empty() {
        return Scorable::default();
    }

    // Ties go to the group found first
    let mut best = 0;
    for (i, scorable) in scorables.iter().enumerate() {
        if scorable.score() > scorables[best].score() {
            best = i;
        }
    }

    let mut chosen = scorables.remove(best);
    for other in scorables {
        chosen.unconnected.extend(other.valid);
        chosen.unconnected.extend(other.unconnected);
        chosen.invalid.extend(other.invalid);
        chosen.words.extend(other.words);
        chosen.nonwords.extend(other.nonwords);
    }
    chosen
}

fn score_component(component: &TileSet, judge: &Judge) -> Scorable {
    if component.len() <= 1 {
        return Scorable {
            invalid: component.clone(),
            ..Default::default()
        };
    }

    let (words, nonwords): (Vec<Word>, Vec<Word>) = find_words(component, judge)
        .into_iter()
        .partition(|word| word.valid);
    let valid = tiles_of(&words);
    let invalid = tiles_of(&nonwords);

    let solution = if valid.len() < component.len() {
        // Some tiles only sit in nonwords, drop them and rescore the rest
        solve(&valid, judge)
    } else if !invalid.is_empty() {
        prune(component, &invalid, judge)
    } else {
        return Scorable {
            valid,
            words,
            nonwords,
            ..Default::default()
        };
    };

    // Tiles stranded inside the recursive solution stay reported
    let mut invalid = invalid;
    invalid.extend(solution.invalid);

    Scorable {
        valid: solution.valid,
        unconnected: solution.unconnected,
        invalid,
        words,
        nonwords,
    }
}

/// Every tile is part of some real word, but some nonword crosses them.
/// Try lifting each suspect tile in turn and keep whichever leaves the most points.
fn prune(component: &TileSet, suspects: &TileSet, judge: &Judge) -> Scorable {
    let mut best: Option<(Coordinate, Scorable)> = None;

    for position in suspects.coordinates() {
        let attempt = solve(&component.without(&position), judge);
        if best
            .as_ref()
            .map_or(true, |(_, b)| attempt.score() > b.score())
        {
            best = Some((position, attempt));
        }
    }

    match best {
        Some((position, attempt)) => {
            tracing::debug!("Lifting {position} leaves {} points", attempt.score());
            attempt
        }
        None => Scorable::default(),
    }
}

fn tiles_of(words: &[Word]) -> TileSet {
    words
        .iter()
        .flat_map(|word| word.tiles.iter().map(|(c, t)| (*c, *t)))
        .collect()
}

/// Every maximal run of two or more tiles reading right or down
fn find_words(component: &TileSet, judge: &Judge) -> Vec<Word> {
    let mut words = vec![];

    for (&start, _) in component {
        for direction in [Direction::East, Direction::South] {
            if component.contains(&start.add(direction.opposite())) {
                continue;
            }

            let mut tiles = TileSet::new();
            let mut cursor = start;
            let mut end = start;
            while let Some(tile) = component.get(&cursor) {
                tiles.insert(cursor, *tile);
                end = cursor;
                cursor = cursor.add(direction);
            }
            if tiles.len() < 2 {
                continue;
            }

            let value: String = tiles.iter().map(|(_, tile)| tile.value).collect();
            let valid = judge.contains(&value);
            tracing::debug!("Found {value} from {start} to {end}, valid: {valid}");
            words.push(Word {
                start,
                end,
                value,
                valid,
                tiles,
            });
        }
    }

    words
}
