use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

use crate::bag::Tile;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub fn opposite(self) -> Self {
        use Direction::*;

        match self {
            North => South,
            East => West,
            South => North,
            West => East,
        }
    }
}

/// Grid position, `x` is the column and `y` the row.
///
/// Coordinates order in reading order (row first, then column), which is the
/// order tile sets iterate in and the order the scorer breaks ties by.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Deserialize, Serialize)]
pub struct Coordinate {
    #[serde(rename = "X")]
    pub x: usize,
    #[serde(rename = "Y")]
    pub y: usize,
}

impl Coordinate {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    pub fn add(self, direction: Direction) -> Coordinate {
        use Direction::*;

        Coordinate {
            x: match direction {
                West => usize::wrapping_sub(self.x, 1),
                East => self.x + 1,
                North | South => self.x,
            },
            y: match direction {
                North => usize::wrapping_sub(self.y, 1),
                South => self.y + 1,
                East | West => self.y,
            },
        }
    }

    /// Return coordinates of the horizontal and vertical neighbors, from north clockwise
    pub fn neighbors_4(&self) -> [Coordinate; 4] {
        use Direction::*;

        [
            self.add(North),
            self.add(East),
            self.add(South),
            self.add(West),
        ]
    }
}

impl Ord for Coordinate {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl PartialOrd for Coordinate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl std::cmp::PartialEq<(usize, usize)> for Coordinate {
    fn eq(&self, (x, y): &(usize, usize)) -> bool {
        self.x == *x && self.y == *y
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Square {
    Empty,
    Occupied(Tile),
}

impl From<Option<Tile>> for Square {
    fn from(cell: Option<Tile>) -> Self {
        match cell {
            Some(tile) => Square::Occupied(tile),
            None => Square::Empty,
        }
    }
}

impl From<Square> for Option<Tile> {
    fn from(square: Square) -> Self {
        match square {
            Square::Occupied(tile) => Some(tile),
            Square::Empty => None,
        }
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            Square::Empty => write!(f, "_"),
            Square::Occupied(tile) => write!(f, "{}", tile.value),
        }
    }
}

/// A player's grid as submitted over the wire: rows of nullable tiles.
/// Rows are allowed to differ in length.
#[derive(Clone, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<Vec<Option<Tile>>>", into = "Vec<Vec<Option<Tile>>>")]
pub struct Board {
    pub squares: Vec<Vec<Square>>,
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            squares: vec![vec![Square::Empty; width]; height],
        }
    }

    pub fn width(&self) -> usize {
        self.squares.iter().map(|row| row.len()).max().unwrap_or(0)
    }

    pub fn height(&self) -> usize {
        self.squares.len()
    }

    pub fn get(&self, position: Coordinate) -> Option<Square> {
        self.squares
            .get(position.y)
            .and_then(|row| row.get(position.x))
            .copied()
    }

    /// Every placed tile, keyed by position. Point values are recomputed from
    /// the letter so that nothing the client claims about points is trusted.
    pub fn tile_set(&self) -> TileSet {
        self.squares
            .iter()
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter().enumerate().filter_map(move |(x, square)| match square {
                    Square::Occupied(tile) => Some((Coordinate { x, y }, Tile::new(tile.value))),
                    Square::Empty => None,
                })
            })
            .collect()
    }

    pub fn from_string<S: AsRef<str>>(s: S) -> Board {
        let squares = s
            .as_ref()
            .split('\n')
            .filter(|line| !line.chars().all(|c| c.is_whitespace()))
            .map(|line| {
                line.split_whitespace()
                    .map(|cell| match cell.chars().next() {
                        Some('_') | None => Square::Empty,
                        Some(letter) => Square::Occupied(Tile::new(letter)),
                    })
                    .collect()
            })
            .collect();

        Board { squares }
    }
}

impl From<Vec<Vec<Option<Tile>>>> for Board {
    fn from(rows: Vec<Vec<Option<Tile>>>) -> Self {
        Board {
            squares: rows
                .into_iter()
                .map(|row| row.into_iter().map(Square::from).collect())
                .collect(),
        }
    }
}

impl From<Board> for Vec<Vec<Option<Tile>>> {
    fn from(board: Board) -> Self {
        board
            .squares
            .into_iter()
            .map(|row| row.into_iter().map(Option::from).collect())
            .collect()
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            self.squares
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|sq| sq.to_string())
                        .collect::<Vec<String>>()
                        .join(" ")
                })
                .collect::<Vec<String>>()
                .join("\n")
        )
    }
}

/// One tile on the wire, flattened with its position
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedTile {
    #[serde(flatten)]
    pub position: Coordinate,
    #[serde(flatten)]
    pub tile: Tile,
}

/// Tiles keyed by their position, iterating in reading order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<PlacedTile>", into = "Vec<PlacedTile>")]
pub struct TileSet(BTreeMap<Coordinate, Tile>);

impl TileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, position: &Coordinate) -> Option<&Tile> {
        self.0.get(position)
    }

    pub fn contains(&self, position: &Coordinate) -> bool {
        self.0.contains_key(position)
    }

    pub fn insert(&mut self, position: Coordinate, tile: Tile) {
        self.0.insert(position, tile);
    }

    pub fn remove(&mut self, position: &Coordinate) -> Option<Tile> {
        self.0.remove(position)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, Coordinate, Tile> {
        self.0.iter()
    }

    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.0.keys().copied()
    }

    pub fn points(&self) -> u32 {
        self.0.values().map(|tile| tile.points).sum()
    }

    pub fn without(&self, position: &Coordinate) -> TileSet {
        let mut remaining = self.clone();
        remaining.remove(position);
        remaining
    }

    /// Splits the set into its 4-connected groups. Groups come out ordered by
    /// their first tile in reading order.
    pub fn components(&self) -> Vec<TileSet> {
        let mut seen = TileSet::new();
        let mut components = vec![];

        fn dfs(set: &TileSet, position: Coordinate, seen: &mut TileSet, found: &mut TileSet) {
            let Some(tile) = set.get(&position) else {
                return;
            };
            if seen.contains(&position) {
                return;
            }
            seen.insert(position, *tile);
            found.insert(position, *tile);
            for neighbor in position.neighbors_4() {
                dfs(set, neighbor, seen, found);
            }
        }

        for position in self.coordinates() {
            if seen.contains(&position) {
                continue;
            }
            let mut found = TileSet::new();
            dfs(self, position, &mut seen, &mut found);
            components.push(found);
        }

        components
    }
}

impl Extend<(Coordinate, Tile)> for TileSet {
    fn extend<I: IntoIterator<Item = (Coordinate, Tile)>>(&mut self, iter: I) {
        self.0.extend(iter)
    }
}

impl FromIterator<(Coordinate, Tile)> for TileSet {
    fn from_iter<I: IntoIterator<Item = (Coordinate, Tile)>>(iter: I) -> Self {
        TileSet(iter.into_iter().collect())
    }
}

impl IntoIterator for TileSet {
    type Item = (Coordinate, Tile);
    type IntoIter = btree_map::IntoIter<Coordinate, Tile>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a TileSet {
    type Item = (&'a Coordinate, &'a Tile);
    type IntoIter = btree_map::Iter<'a, Coordinate, Tile>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Vec<PlacedTile>> for TileSet {
    fn from(tiles: Vec<PlacedTile>) -> Self {
        tiles.into_iter().map(|t| (t.position, t.tile)).collect()
    }
}

impl From<TileSet> for Vec<PlacedTile> {
    fn from(set: TileSet) -> Self {
        set.into_iter()
            .map(|(position, tile)| PlacedTile { position, tile })
            .collect()
    }
}

impl fmt::Display for TileSet {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            self.iter()
                .map(|(position, tile)| format!("{}@{}", tile.value, position))
                .collect::<Vec<_>>()
                .join(" ")
        )
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn builds_from_strings() {
        let b = Board::from_string(
            "C A T\n\
             _ C _\n\
             _ T _",
        );
        assert_eq!(b.width(), 3);
        assert_eq!(b.height(), 3);
        assert_eq!(b.get(Coordinate::new(1, 0)), Some(Square::Occupied(Tile::new('A'))));
        assert_eq!(b.get(Coordinate::new(0, 1)), Some(Square::Empty));
        assert_eq!(b.get(Coordinate::new(3, 0)), None);
        assert_eq!(b.to_string(), "C A T\n_ C _\n_ T _");
    }

    #[test]
    fn reading_order() {
        let mut coords = vec![
            Coordinate::new(0, 2),
            Coordinate::new(2, 0),
            Coordinate::new(1, 1),
            Coordinate::new(0, 0),
        ];
        coords.sort();
        assert_eq!(coords, vec![(0, 0), (2, 0), (1, 1), (0, 2)]);
    }

    #[test]
    fn tile_set_ignores_claimed_points() {
        let b: Board = serde_json::from_str(
            r#"[[{"Value":"Q","Points":1}, null], [null, {"Value":"I","Points":99}]]"#,
        )
        .unwrap();
        let tiles = b.tile_set();
        assert_eq!(tiles.len(), 2);
        assert_eq!(tiles.points(), 11);
        assert_eq!(tiles.get(&Coordinate::new(1, 1)), Some(&Tile::new('I')));
    }

    #[test]
    fn parses_jagged_grids() {
        let b: Board =
            serde_json::from_str(r#"[[null], [null, null, {"Value":"A","Points":1}], []]"#)
                .unwrap();
        assert_eq!(b.height(), 3);
        assert_eq!(b.width(), 3);
        assert_eq!(
            b.tile_set().coordinates().collect::<Vec<_>>(),
            vec![Coordinate::new(2, 1)]
        );
    }

    #[test]
    fn grid_serializes_as_nullable_rows() {
        let b = Board::from_string("A _");
        assert_eq!(
            serde_json::to_string(&b).unwrap(),
            r#"[[{"Value":"A","Points":1},null]]"#
        );
    }

    #[test]
    fn finds_components() {
        let b = Board::from_string(
            "C A T\n\
             _ _ _\n\
             _ A T\n\
             S _ _",
        );
        let components = b.tile_set().components();
        assert_eq!(components.len(), 3);
        assert_eq!(components[0].to_string(), "C@(0, 0) A@(1, 0) T@(2, 0)");
        assert_eq!(components[1].to_string(), "A@(1, 2) T@(2, 2)");
        assert_eq!(components[2].to_string(), "S@(0, 3)");
    }

    #[test]
    fn components_follow_bends() {
        let b = Board::from_string(
            "_ _ S\n\
             C A T\n\
             A _ _",
        );
        let components = b.tile_set().components();
        assert_eq!(components.len(), 1);
        assert_eq!(components[0].len(), 5);
    }

    #[test]
    fn tile_sets_on_the_wire() {
        let set: TileSet = [(Coordinate::new(2, 1), Tile::new('Z'))].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"[{"X":2,"Y":1,"Value":"Z","Points":10}]"#);
        assert_eq!(serde_json::from_str::<TileSet>(&json).unwrap(), set);
    }
}
