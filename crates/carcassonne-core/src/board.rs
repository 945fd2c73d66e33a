//! Board representation: placed tiles on a sparse grid.
//!
//! This module contains:
//! - Tile ids and follower placements
//! - The placed-tile record with its cached rotated layout
//! - The board grid and neighbor queries

use crate::game::GameError;
use crate::geometry::{Coord, Direction};
use crate::player::PlayerColor;
use crate::tile::{EdgeGroup, FeatureKind, FeatureLayout, Rotation, TileDefinition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;

/// Identifier of a placed tile, unique within one board
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u32);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A follower standing on one feature of a placed tile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowerPlacement {
    /// Username of the owning player
    pub owner: String,
    pub color: PlayerColor,
    pub kind: FeatureKind,
    /// Edge-group the follower stands on, in board orientation
    pub group: EdgeGroup,
}

/// A tile that has been put on the board
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedTile {
    id: TileId,
    coord: Coord,
    rotation: Rotation,
    definition: TileDefinition,
    /// Layout after rotation, computed once in [`PlacedTile::new`]
    layout: Option<FeatureLayout>,
    follower: Option<FollowerPlacement>,
}

impl PlacedTile {
    pub fn new(
        id: TileId,
        coord: Coord,
        definition: TileDefinition,
        rotation: Rotation,
        follower: Option<FollowerPlacement>,
    ) -> Self {
        let layout = definition.rotated_layout(rotation);
        Self {
            id,
            coord,
            rotation,
            definition,
            layout,
            follower,
        }
    }

    /// Attach a follower placement
    pub fn with_follower(mut self, follower: Option<FollowerPlacement>) -> Self {
        self.follower = follower;
        self
    }

    pub fn id(&self) -> TileId {
        self.id
    }

    pub fn coord(&self) -> Coord {
        self.coord
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    pub fn definition(&self) -> &TileDefinition {
        &self.definition
    }

    /// Name of the tile type
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Rotated feature layout
    pub fn layout(&self) -> Option<&FeatureLayout> {
        self.layout.as_ref()
    }

    pub fn follower(&self) -> Option<&FollowerPlacement> {
        self.follower.as_ref()
    }

    pub fn extra_points(&self) -> bool {
        self.definition.extra_points
    }

    /// Feature on one side, in board orientation
    pub fn kind_at(&self, direction: Direction) -> Option<FeatureKind> {
        crate::tile::kind_at(self.layout(), direction)
    }

    /// Edge-group of `kind` reaching `direction`, in board orientation
    pub fn group_at(&self, kind: FeatureKind, direction: Direction) -> Option<&EdgeGroup> {
        self.layout()?.group_at(kind, direction)
    }
}

/// The game board. Cells are filled once and never emptied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "BoardJson", from = "BoardJson")]
pub struct Board {
    tiles: HashMap<Coord, PlacedTile>,
    next_id: u32,
}

impl Board {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the tile at a coordinate
    pub fn get(&self, coord: Coord) -> Option<&PlacedTile> {
        self.tiles.get(&coord)
    }

    /// Find a tile by id
    pub fn tile(&self, id: TileId) -> Option<&PlacedTile> {
        self.tiles.values().find(|tile| tile.id == id)
    }

    /// Insert a tile at its coordinate
    pub fn put(&mut self, tile: PlacedTile) -> Result<(), GameError> {
        if self.tiles.contains_key(&tile.coord) {
            return Err(GameError::OccupiedCoordinate(tile.coord));
        }
        self.next_id = self.next_id.max(tile.id.0 + 1);
        self.tiles.insert(tile.coord, tile);
        Ok(())
    }

    /// Get the tile next to `coord` on side `direction`
    pub fn neighbor(&self, coord: Coord, direction: Direction) -> Option<&PlacedTile> {
        coord.neighbor(direction).and_then(|coord| self.get(coord))
    }

    /// Whether any of the four cells around `coord` is occupied
    pub fn has_neighbor(&self, coord: Coord) -> bool {
        Direction::ALL
            .iter()
            .any(|direction| self.neighbor(coord, *direction).is_some())
    }

    /// Id the next placed tile should receive
    pub fn next_tile_id(&self) -> TileId {
        TileId(self.next_id)
    }

    /// Empty cells touching at least one tile, sorted.
    ///
    /// An empty board has a single open position, the origin.
    pub fn open_positions(&self) -> Vec<Coord> {
        if self.tiles.is_empty() {
            return vec![Coord::ORIGIN];
        }
        let open: BTreeSet<Coord> = self
            .tiles
            .keys()
            .flat_map(|coord| coord.neighbors())
            .map(|(_, coord)| coord)
            .filter(|coord| !self.tiles.contains_key(coord))
            .collect();
        open.into_iter().collect()
    }

    pub fn tiles(&self) -> impl Iterator<Item = &PlacedTile> {
        self.tiles.values()
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Convert to a JSON-friendly representation with a list instead of a map.
    /// JSON object keys cannot be coordinates.
    pub fn to_json_friendly(&self) -> BoardJson {
        let mut tiles: Vec<PlacedTile> = self.tiles.values().cloned().collect();
        tiles.sort_by_key(|tile| tile.id);
        BoardJson {
            tiles,
            next_id: self.next_id,
        }
    }
}

/// JSON-friendly board representation, tiles ordered by id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardJson {
    pub tiles: Vec<PlacedTile>,
    pub next_id: u32,
}

impl From<Board> for BoardJson {
    fn from(board: Board) -> Self {
        board.to_json_friendly()
    }
}

impl From<BoardJson> for Board {
    fn from(json: BoardJson) -> Self {
        let tiles = json
            .tiles
            .into_iter()
            .map(|tile| (tile.coord, tile))
            .collect();
        Self {
            tiles,
            next_id: json.next_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Direction::{Bottom, Left, Right, Top};

    fn straight() -> TileDefinition {
        TileDefinition::new("straight", Some(FeatureLayout::new(&[&[Top, Bottom]], &[])))
    }

    fn place(board: &mut Board, coord: Coord, rotation: Rotation) -> Result<(), GameError> {
        let id = board.next_tile_id();
        board.put(PlacedTile::new(id, coord, straight(), rotation, None))
    }

    #[test]
    fn test_put_and_get() {
        let mut board = Board::new();
        assert!(board.is_empty());
        place(&mut board, Coord::ORIGIN, Rotation::Deg0).unwrap();

        let tile = board.get(Coord::ORIGIN).unwrap();
        assert_eq!(tile.id(), TileId(0));
        assert_eq!(tile.name(), "straight");
        assert_eq!(board.len(), 1);
        assert_eq!(board.next_tile_id(), TileId(1));
        assert_eq!(board.tile(TileId(0)).unwrap().coord(), Coord::ORIGIN);
    }

    #[test]
    fn test_put_occupied_fails() {
        let mut board = Board::new();
        place(&mut board, Coord::ORIGIN, Rotation::Deg0).unwrap();
        let before = board.clone();

        let result = place(&mut board, Coord::ORIGIN, Rotation::Deg90);
        assert_eq!(result, Err(GameError::OccupiedCoordinate(Coord::ORIGIN)));
        assert_eq!(board, before);
    }

    #[test]
    fn test_rotated_layout_is_cached() {
        let tile = PlacedTile::new(TileId(3), Coord::new(1, 0), straight(), Rotation::Deg90, None);
        assert_eq!(tile.kind_at(Right), Some(FeatureKind::Road));
        assert_eq!(tile.kind_at(Top), None);
        assert_eq!(
            tile.group_at(FeatureKind::Road, Left).unwrap().directions(),
            &[Right, Left]
        );
        // The definition keeps its printed orientation.
        assert_eq!(
            tile.definition().layout.as_ref().unwrap().roads[0].directions(),
            &[Top, Bottom]
        );
    }

    #[test]
    fn test_neighbor_lookup() {
        let mut board = Board::new();
        place(&mut board, Coord::ORIGIN, Rotation::Deg0).unwrap();
        place(&mut board, Coord::new(0, 1), Rotation::Deg0).unwrap();

        assert_eq!(board.neighbor(Coord::ORIGIN, Top).unwrap().id(), TileId(1));
        assert!(board.neighbor(Coord::ORIGIN, Bottom).is_none());
        assert!(board.has_neighbor(Coord::new(1, 1)));
        assert!(!board.has_neighbor(Coord::new(2, 2)));
    }

    #[test]
    fn test_open_positions() {
        let mut board = Board::new();
        assert_eq!(board.open_positions(), vec![Coord::ORIGIN]);

        place(&mut board, Coord::ORIGIN, Rotation::Deg0).unwrap();
        place(&mut board, Coord::new(1, 0), Rotation::Deg0).unwrap();

        let open = board.open_positions();
        assert_eq!(open.len(), 6);
        assert!(!open.contains(&Coord::ORIGIN));
        assert!(open.contains(&Coord::new(2, 0)));
        assert!(open.contains(&Coord::new(-1, 0)));
        assert!(open.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn test_board_json_round_trip() {
        let mut board = Board::new();
        place(&mut board, Coord::ORIGIN, Rotation::Deg0).unwrap();
        place(&mut board, Coord::new(-1, 0), Rotation::Deg270).unwrap();

        let json = serde_json::to_string(&board).unwrap();
        let restored: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, board);
        assert_eq!(restored.next_tile_id(), TileId(2));
    }
}
