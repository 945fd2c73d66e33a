//! Feature paths and the registry that owns them.
//!
//! A [`Path`] is a chain of connected road or city segments spanning one or
//! more tiles. Its `members` map records, per tile, the sides already folded
//! into the path; that set is also what stops the tracker from walking back
//! the way it came.

use crate::board::{Board, PlacedTile, TileId};
use crate::geometry::{Coord, Direction};
use crate::tile::{EdgeGroup, FeatureKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of a path, unique across both kinds within a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathId(pub u64);

impl fmt::Display for PathId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "path-{}", self.0)
    }
}

/// Sides of one tile that belong to a path
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathMember {
    pub coord: Coord,
    pub directions: BTreeSet<Direction>,
}

/// Points a tile's edge-group adds to a path when it joins it
pub fn segment_points(kind: FeatureKind, group: &EdgeGroup, extra_points: bool) -> u32 {
    let base = group.len() as u32 * kind.segment_value();
    if extra_points {
        base * 2
    } else {
        base
    }
}

/// A connected road or city
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub id: PathId,
    pub kind: FeatureKind,
    pub members: BTreeMap<TileId, PathMember>,
    /// Usernames of players with a follower on the path, first-seen order
    pub owners: Vec<String>,
    pub points: u32,
    pub completed: bool,
}

impl Path {
    fn new(id: PathId, kind: FeatureKind) -> Self {
        Self {
            id,
            kind,
            members: BTreeMap::new(),
            owners: Vec::new(),
            points: 0,
            completed: false,
        }
    }

    /// Whether side `direction` of tile `tile` is part of this path
    pub fn contains(&self, tile: TileId, direction: Direction) -> bool {
        self.members
            .get(&tile)
            .is_some_and(|member| member.directions.contains(&direction))
    }

    /// Record a tile's edge-group and add its points
    pub fn add_segment(&mut self, tile: &PlacedTile, group: &EdgeGroup) {
        let member = self.members.entry(tile.id()).or_insert_with(|| PathMember {
            coord: tile.coord(),
            directions: BTreeSet::new(),
        });
        member.directions.extend(group.iter());
        self.points += segment_points(self.kind, group, tile.extra_points());
    }

    /// Add an owner unless already listed
    pub fn add_owner(&mut self, owner: &str) {
        if !self.owners.iter().any(|o| o == owner) {
            self.owners.push(owner.to_string());
        }
    }

    /// Take over the members, points and owners of another path
    pub fn absorb(&mut self, other: Path) {
        for (tile, member) in other.members {
            match self.members.get_mut(&tile) {
                Some(existing) => existing.directions.extend(member.directions),
                None => {
                    self.members.insert(tile, member);
                }
            }
        }
        self.points += other.points;
        for owner in &other.owners {
            self.add_owner(owner);
        }
    }

    /// Member sides with no tile next to them yet
    pub fn open_ends(&self, board: &Board) -> Vec<(Coord, Direction)> {
        self.members
            .values()
            .flat_map(|member| member.directions.iter().map(move |d| (member.coord, *d)))
            .filter(|(coord, direction)| board.neighbor(*coord, *direction).is_none())
            .collect()
    }

    /// Whether every member side has a neighbor on the board
    pub fn is_closed(&self, board: &Board) -> bool {
        self.members.values().all(|member| {
            member
                .directions
                .iter()
                .all(|direction| board.neighbor(member.coord, *direction).is_some())
        })
    }

    /// Number of tiles the path runs through
    pub fn tile_count(&self) -> usize {
        self.members.len()
    }
}

/// All paths of a game, one collection per feature kind
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathRegistry {
    roads: BTreeMap<PathId, Path>,
    cities: BTreeMap<PathId, Path>,
    next_id: u64,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paths(&self, kind: FeatureKind) -> &BTreeMap<PathId, Path> {
        match kind {
            FeatureKind::Road => &self.roads,
            FeatureKind::City => &self.cities,
        }
    }

    fn paths_mut(&mut self, kind: FeatureKind) -> &mut BTreeMap<PathId, Path> {
        match kind {
            FeatureKind::Road => &mut self.roads,
            FeatureKind::City => &mut self.cities,
        }
    }

    /// Every path of both kinds
    pub fn iter(&self) -> impl Iterator<Item = &Path> {
        self.roads.values().chain(self.cities.values())
    }

    pub fn get(&self, kind: FeatureKind, id: PathId) -> Option<&Path> {
        self.paths(kind).get(&id)
    }

    pub fn get_mut(&mut self, kind: FeatureKind, id: PathId) -> Option<&mut Path> {
        self.paths_mut(kind).get_mut(&id)
    }

    /// Find a path by id in either collection
    pub fn find(&self, id: PathId) -> Option<&Path> {
        self.roads.get(&id).or_else(|| self.cities.get(&id))
    }

    pub fn find_mut(&mut self, id: PathId) -> Option<&mut Path> {
        match self.roads.get_mut(&id) {
            Some(path) => Some(path),
            None => self.cities.get_mut(&id),
        }
    }

    /// The path of `kind` that side `direction` of `tile` belongs to
    pub fn path_at(&self, kind: FeatureKind, tile: TileId, direction: Direction) -> Option<&Path> {
        self.paths(kind)
            .values()
            .find(|path| path.contains(tile, direction))
    }

    fn allocate_id(&mut self) -> PathId {
        let id = PathId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Create an empty path
    pub fn create(&mut self, kind: FeatureKind) -> PathId {
        let id = self.allocate_id();
        self.paths_mut(kind).insert(id, Path::new(id, kind));
        id
    }

    /// Remove a path from the registry
    pub fn remove(&mut self, kind: FeatureKind, id: PathId) -> Option<Path> {
        self.paths_mut(kind).remove(&id)
    }

    /// Replace several paths by one new path carrying their union.
    ///
    /// Ids that are not in the registry are ignored.
    pub fn merge(&mut self, kind: FeatureKind, ids: &[PathId]) -> PathId {
        let merged_id = self.allocate_id();
        let mut merged = Path::new(merged_id, kind);
        for id in ids {
            if let Some(path) = self.remove(kind, *id) {
                merged.absorb(path);
            }
        }
        self.paths_mut(kind).insert(merged_id, merged);
        merged_id
    }

    pub fn completed_paths(&self, kind: FeatureKind) -> impl Iterator<Item = &Path> {
        self.paths(kind).values().filter(|path| path.completed)
    }

    /// Paths on which `player` has a follower
    pub fn paths_owned_by<'a>(&'a self, player: &'a str) -> impl Iterator<Item = &'a Path> + 'a {
        self.iter()
            .filter(move |path| path.owners.iter().any(|owner| owner == player))
    }

    /// Open sides of every unfinished path of `kind`
    pub fn open_ends(&self, kind: FeatureKind, board: &Board) -> Vec<(PathId, Coord, Direction)> {
        self.paths(kind)
            .values()
            .filter(|path| !path.completed)
            .flat_map(|path| {
                path.open_ends(board)
                    .into_iter()
                    .map(move |(coord, direction)| (path.id, coord, direction))
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.roads.len() + self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roads.is_empty() && self.cities.is_empty()
    }
}
