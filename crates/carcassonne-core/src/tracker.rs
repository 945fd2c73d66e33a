//! Incremental path tracking.
//!
//! [`integrate`] folds a freshly placed tile into the path registry: each of
//! its edge-groups extends the open path it touches, merges the paths it
//! connects, or starts a new one. Afterwards only the paths touched by the
//! placement are checked for completion.

use crate::board::{Board, PlacedTile};
use crate::path::{PathId, PathRegistry};
use crate::tile::{EdgeGroup, FeatureKind};
use std::collections::BTreeSet;
use tracing::debug;

/// Result of integrating one tile
#[derive(Debug, Clone)]
pub struct Integration {
    /// Registry with the tile folded in
    pub registry: PathRegistry,
    /// Paths created or extended by the placement that still exist
    pub touched: BTreeSet<PathId>,
    /// Paths that became complete with this placement
    pub completed: Vec<PathId>,
}

/// Fold `tile` into a copy of `registry`.
///
/// `tile` must already be on `board` and must have passed placement
/// validation; an unvalidated tile may leave the registry inconsistent.
pub fn integrate(board: &Board, registry: &PathRegistry, tile: &PlacedTile) -> Integration {
    let mut tracker = Tracker {
        board,
        registry: registry.clone(),
        touched: BTreeSet::new(),
    };

    if let Some(layout) = tile.layout() {
        for kind in FeatureKind::ALL {
            for group in layout.groups(kind) {
                tracker.integrate_group(tile, kind, group);
            }
        }
    }

    let Tracker {
        mut registry,
        touched,
        ..
    } = tracker;

    let mut completed = Vec::new();
    for id in &touched {
        let Some(path) = registry.find_mut(*id) else {
            continue;
        };
        let closed = path.is_closed(board);
        if closed && !path.completed {
            debug!(path = %id, kind = %path.kind, points = path.points, "path completed");
            completed.push(*id);
        }
        path.completed = closed;
    }

    Integration {
        registry,
        touched,
        completed,
    }
}

struct Tracker<'a> {
    board: &'a Board,
    registry: PathRegistry,
    touched: BTreeSet<PathId>,
}

impl<'a> Tracker<'a> {
    fn integrate_group(&mut self, tile: &PlacedTile, kind: FeatureKind, group: &EdgeGroup) {
        let mut found: Vec<PathId> = Vec::new();
        for direction in group.iter() {
            let Some(neighbor) = self.board.neighbor(tile.coord(), direction) else {
                continue;
            };
            let Some(path) = self
                .registry
                .path_at(kind, neighbor.id(), direction.opposite())
            else {
                continue;
            };
            if !path.completed && !found.contains(&path.id) {
                found.push(path.id);
            }
        }

        let path_id = match found.as_slice() {
            [] => {
                let id = self.registry.create(kind);
                debug!(path = %id, %kind, tile = %tile.id(), "path created");
                id
            }
            [single] => *single,
            several => {
                let id = self.registry.merge(kind, several);
                for merged in several {
                    self.touched.remove(merged);
                }
                debug!(path = %id, %kind, merged = several.len(), "paths merged");
                id
            }
        };

        self.fold(tile, kind, group, path_id);
    }

    /// Record `group` of `tile` in `path_id`, then follow its sides onto
    /// neighbors whose facing segment is not in the path yet.
    fn fold(&mut self, tile: &PlacedTile, kind: FeatureKind, group: &EdgeGroup, path_id: PathId) {
        let Some(path) = self.registry.get_mut(kind, path_id) else {
            return;
        };
        if group.iter().any(|direction| path.contains(tile.id(), direction)) {
            return;
        }

        path.add_segment(tile, group);
        if let Some(follower) = tile.follower() {
            if follower.kind == kind && follower.group.intersects(group.directions()) {
                path.add_owner(&follower.owner);
            }
        }
        self.touched.insert(path_id);

        let board = self.board;
        for direction in group.iter() {
            let facing = direction.opposite();
            let Some(neighbor) = board.neighbor(tile.coord(), direction) else {
                continue;
            };
            let Some(next_group) = neighbor.group_at(kind, facing) else {
                continue;
            };

            let recorded = self
                .registry
                .path_at(kind, neighbor.id(), facing)
                .map(|path| (path.id, path.completed));
            match recorded {
                Some((id, _)) if id == path_id => {}
                Some((_, true)) => {}
                Some((other, false)) => self.absorb(kind, other, path_id),
                None => self.fold(neighbor, kind, next_group, path_id),
            }
        }
    }

    fn absorb(&mut self, kind: FeatureKind, other: PathId, into: PathId) {
        let Some(absorbed) = self.registry.remove(kind, other) else {
            return;
        };
        if let Some(path) = self.registry.get_mut(kind, into) {
            debug!(path = %into, absorbed = %other, %kind, "path absorbed");
            path.absorb(absorbed);
        }
        self.touched.remove(&other);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{FollowerPlacement, TileId};
    use crate::geometry::{Coord, Direction};
    use crate::path::Path;
    use crate::player::PlayerColor;
    use crate::tile::{FeatureLayout, Rotation, TileDefinition};
    use pretty_assertions::assert_eq;
    use Direction::{Bottom, Left, Right, Top};

    /// Test fixture: a board and registry advanced one tile at a time
    struct Table {
        board: Board,
        registry: PathRegistry,
    }

    impl Table {
        fn new() -> Self {
            Self {
                board: Board::new(),
                registry: PathRegistry::new(),
            }
        }

        fn place(&mut self, coord: Coord, definition: TileDefinition) -> Integration {
            self.place_with(coord, definition, None)
        }

        fn place_with(
            &mut self,
            coord: Coord,
            definition: TileDefinition,
            follower: Option<FollowerPlacement>,
        ) -> Integration {
            let tile = PlacedTile::new(
                self.board.next_tile_id(),
                coord,
                definition,
                Rotation::Deg0,
                follower,
            );
            self.board.put(tile.clone()).unwrap();
            let integration = integrate(&self.board, &self.registry, &tile);
            self.registry = integration.registry.clone();
            integration
        }

        fn road_at(&self, coord: Coord, direction: Direction) -> &Path {
            let tile = self.board.get(coord).unwrap();
            self.registry
                .path_at(FeatureKind::Road, tile.id(), direction)
                .unwrap()
        }
    }

    fn def(roads: &[&[Direction]], cities: &[&[Direction]]) -> TileDefinition {
        TileDefinition::new("test", Some(FeatureLayout::new(roads, cities)))
    }

    fn road_follower(owner: &str, directions: &[Direction]) -> Option<FollowerPlacement> {
        Some(FollowerPlacement {
            owner: owner.to_string(),
            color: PlayerColor::Green,
            kind: FeatureKind::Road,
            group: EdgeGroup::new(directions),
        })
    }

    /// Road {Top}, city {Right, Bottom}
    fn scenario_start() -> TileDefinition {
        def(&[&[Top]], &[&[Right, Bottom]])
    }

    #[test]
    fn test_first_tile_creates_paths() {
        let mut table = Table::new();
        let result = table.place(Coord::ORIGIN, scenario_start());

        assert_eq!(result.registry.paths(FeatureKind::Road).len(), 1);
        assert_eq!(result.registry.paths(FeatureKind::City).len(), 1);

        let road = result.registry.paths(FeatureKind::Road).values().next().unwrap();
        assert_eq!(road.points, 1);
        assert!(!road.completed);

        let city = result.registry.paths(FeatureKind::City).values().next().unwrap();
        assert_eq!(city.points, 4);
        assert!(!city.completed);

        assert_eq!(result.touched.len(), 2);
        assert!(result.completed.is_empty());
    }

    #[test]
    fn test_dead_end_extends_and_closes_road() {
        let mut table = Table::new();
        table.place(Coord::ORIGIN, scenario_start());
        let road_id = table.road_at(Coord::ORIGIN, Top).id;

        let result = table.place(Coord::new(0, 1), def(&[&[Bottom]], &[]));
        let road = table.road_at(Coord::new(0, 1), Bottom);
        assert_eq!(road.id, road_id);
        assert_eq!(road.points, 2);
        assert!(road.completed);
        assert_eq!(result.completed, vec![road_id]);
        assert_eq!(table.registry.paths(FeatureKind::Road).len(), 1);
    }

    #[test]
    fn test_straight_road_extends_and_stays_open() {
        let mut table = Table::new();
        table.place(Coord::ORIGIN, scenario_start());
        let road_id = table.road_at(Coord::ORIGIN, Top).id;

        let result = table.place(Coord::new(0, 1), def(&[&[Top, Bottom]], &[]));
        let road = table.road_at(Coord::new(0, 1), Top);
        assert_eq!(road.id, road_id);
        assert_eq!(road.points, 3);
        assert!(!road.completed);
        assert!(result.completed.is_empty());
    }

    #[test]
    fn test_untouched_paths_unchanged() {
        let mut table = Table::new();
        let first = table.place(Coord::ORIGIN, scenario_start());
        let city_before = first.registry.paths(FeatureKind::City).clone();

        let result = table.place(Coord::new(0, 1), def(&[&[Bottom]], &[]));
        assert_eq!(result.registry.paths(FeatureKind::City), &city_before);
        assert_eq!(result.touched.len(), 1);
    }

    #[test]
    fn test_merge_two_roads_dedups_owners() {
        let mut table = Table::new();
        table.place_with(Coord::ORIGIN, def(&[&[Right]], &[]), road_follower("alice", &[Right]));
        table.place_with(Coord::new(2, 0), def(&[&[Left]], &[]), road_follower("bob", &[Left]));
        let left = table.road_at(Coord::ORIGIN, Right).clone();
        let right = table.road_at(Coord::new(2, 0), Left).clone();
        assert_ne!(left.id, right.id);

        let result = table.place_with(
            Coord::new(1, 0),
            def(&[&[Left, Right]], &[]),
            road_follower("alice", &[Left]),
        );

        let roads = table.registry.paths(FeatureKind::Road);
        assert_eq!(roads.len(), 1);
        let merged = roads.values().next().unwrap();
        assert!(merged.id != left.id && merged.id != right.id);
        assert_eq!(merged.owners, vec!["alice".to_string(), "bob".to_string()]);
        assert_eq!(merged.points, left.points + right.points + 2);
        assert_eq!(merged.tile_count(), 3);
        assert!(merged.contains(TileId(0), Right));
        assert!(merged.contains(TileId(1), Left));
        assert!(merged.contains(TileId(2), Right));
        assert!(merged.contains(TileId(2), Left));
        assert!(merged.completed);
        assert_eq!(result.completed, vec![merged.id]);
        assert!(!result.touched.contains(&left.id));
    }

    #[test]
    fn test_merge_conserves_points_with_extra_points() {
        let mut table = Table::new();
        table.place(Coord::ORIGIN, def(&[&[Right]], &[]));
        table.place(Coord::new(2, 0), def(&[&[Left, Right]], &[]));
        let p1 = table.road_at(Coord::ORIGIN, Right).points;
        let p2 = table.road_at(Coord::new(2, 0), Left).points;

        let shield = def(&[&[Left, Right]], &[]).with_extra_points();
        table.place(Coord::new(1, 0), shield);

        let merged = table.road_at(Coord::new(1, 0), Left);
        assert_eq!(merged.points, p1 + p2 + 4);
        assert!(!merged.completed);
        assert_eq!(merged.open_ends(&table.board), vec![(Coord::new(2, 0), Right)]);
    }

    #[test]
    fn test_city_loop_completes() {
        // Four corner cities closing a ring around the centre point.
        let mut table = Table::new();
        table.place(Coord::new(0, 0), def(&[], &[&[Top, Right]]));
        table.place(Coord::new(1, 0), def(&[], &[&[Top, Left]]));
        table.place(Coord::new(1, 1), def(&[], &[&[Bottom, Left]]));
        let result = table.place(Coord::new(0, 1), def(&[], &[&[Bottom, Right]]));

        let cities = table.registry.paths(FeatureKind::City);
        assert_eq!(cities.len(), 1);
        let city = cities.values().next().unwrap();
        assert!(city.completed);
        assert_eq!(city.points, 16);
        assert_eq!(result.completed, vec![city.id]);
    }

    #[test]
    fn test_separate_groups_on_one_tile_stay_separate() {
        let mut table = Table::new();
        table.place(Coord::ORIGIN, def(&[&[Top], &[Right], &[Bottom], &[Left]], &[]));
        assert_eq!(table.registry.paths(FeatureKind::Road).len(), 4);

        table.place(Coord::new(0, 1), def(&[&[Bottom, Right]], &[]));
        assert_eq!(table.registry.paths(FeatureKind::Road).len(), 4);
        assert_ne!(
            table.road_at(Coord::ORIGIN, Top).id,
            table.road_at(Coord::ORIGIN, Right).id
        );
    }

    #[test]
    fn test_church_tile_yields_no_paths() {
        let mut table = Table::new();
        let church = TileDefinition::new("church", None).with_church();
        let result = table.place(Coord::ORIGIN, church);
        assert!(result.registry.is_empty());
        assert!(result.touched.is_empty());
    }

    #[test]
    fn test_unrecorded_neighbors_are_folded() {
        // A chain laid directly on the board without integration.
        let mut board = Board::new();
        for (x, roads) in [
            (1, &[Left, Right][..]),
            (2, &[Left, Right][..]),
            (3, &[Left][..]),
        ] {
            let tile = PlacedTile::new(
                board.next_tile_id(),
                Coord::new(x, 0),
                def(&[roads], &[]),
                Rotation::Deg0,
                None,
            );
            board.put(tile).unwrap();
        }
        let tile = PlacedTile::new(
            board.next_tile_id(),
            Coord::ORIGIN,
            def(&[&[Right]], &[]),
            Rotation::Deg0,
            None,
        );
        board.put(tile.clone()).unwrap();

        let result = integrate(&board, &PathRegistry::new(), &tile);
        let roads = result.registry.paths(FeatureKind::Road);
        assert_eq!(roads.len(), 1);
        let road = roads.values().next().unwrap();
        assert_eq!(road.tile_count(), 4);
        assert_eq!(road.points, 6);
        assert!(road.completed);
    }

    #[test]
    fn test_fold_absorbs_other_open_path() {
        let straight = || def(&[&[Left, Right]], &[]);
        let placed = |id, x, definition| {
            PlacedTile::new(TileId(id), Coord::new(x, 0), definition, Rotation::Deg0, None)
        };

        // (2,0) is integrated on its own; (1,0) is on the board but unrecorded.
        let mut board = Board::new();
        let far = placed(0, 2, straight());
        board.put(far.clone()).unwrap();
        let registry = integrate(&board, &PathRegistry::new(), &far).registry;
        let far_points = registry.paths(FeatureKind::Road).values().next().unwrap().points;

        board.put(placed(1, 1, straight())).unwrap();
        let origin = placed(2, 0, def(&[&[Right]], &[]));
        board.put(origin.clone()).unwrap();

        let result = integrate(&board, &registry, &origin);
        let roads = result.registry.paths(FeatureKind::Road);
        assert_eq!(roads.len(), 1);
        let road = roads.values().next().unwrap();
        assert_eq!(road.points, 1 + 2 + far_points);
        assert_eq!(road.tile_count(), 3);
        assert_eq!(result.touched.len(), 1);
        assert!(result.touched.contains(&road.id));
    }

    #[test]
    fn test_completed_paths_stay_completed() {
        let mut table = Table::new();
        table.place(Coord::ORIGIN, def(&[&[Right]], &[]));
        table.place(Coord::new(1, 0), def(&[&[Left]], &[&[Top]]));
        let road_id = table.road_at(Coord::ORIGIN, Right).id;
        assert!(table.registry.find(road_id).unwrap().completed);

        table.place(Coord::new(1, 1), def(&[], &[&[Bottom]]));
        table.place(Coord::new(0, 1), TileDefinition::new("church", None));
        assert!(table.registry.find(road_id).unwrap().completed);
        assert_eq!(table.registry.completed_paths(FeatureKind::City).count(), 1);
    }

    #[test]
    fn test_follower_on_other_group_is_not_owner() {
        let mut table = Table::new();
        let crossing = def(&[&[Top], &[Bottom]], &[]);
        table.place_with(Coord::ORIGIN, crossing, road_follower("carol", &[Top]));

        assert_eq!(table.road_at(Coord::ORIGIN, Top).owners, vec!["carol".to_string()]);
        assert!(table.road_at(Coord::ORIGIN, Bottom).owners.is_empty());
    }
}
