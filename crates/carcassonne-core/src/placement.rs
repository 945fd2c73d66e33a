//! Placement legality: edge matching against occupied neighbors.

use crate::board::Board;
use crate::game::GameError;
use crate::geometry::{Coord, Direction};
use crate::tile::{kind_at, FeatureLayout, Rotation, TileDefinition};

/// Check that a rotated layout may go at `coord`.
///
/// Every occupied neighbor must show the same feature (road, city or
/// nothing) on the facing side. Empty cells impose no constraint.
pub fn validate(
    board: &Board,
    coord: Coord,
    layout: Option<&FeatureLayout>,
) -> Result<(), GameError> {
    if board.get(coord).is_some() {
        return Err(GameError::OccupiedCoordinate(coord));
    }

    for direction in Direction::ALL {
        let Some(neighbor) = board.neighbor(coord, direction) else {
            continue;
        };
        if kind_at(layout, direction) != neighbor.kind_at(direction.opposite()) {
            return Err(GameError::EdgeMismatch { direction });
        }
    }
    Ok(())
}

/// Every open position and rotation where `definition` fits
pub fn valid_placements(board: &Board, definition: &TileDefinition) -> Vec<(Coord, Rotation)> {
    let rotations: Vec<(Rotation, Option<FeatureLayout>)> = Rotation::ALL
        .into_iter()
        .map(|rotation| (rotation, definition.rotated_layout(rotation)))
        .collect();

    board
        .open_positions()
        .into_iter()
        .flat_map(|coord| {
            rotations
                .iter()
                .filter(move |(_, layout)| validate(board, coord, layout.as_ref()).is_ok())
                .map(move |(rotation, _)| (coord, *rotation))
        })
        .collect()
}

/// Whether `definition` can be placed anywhere on the board
pub fn has_valid_placement(board: &Board, definition: &TileDefinition) -> bool {
    board.open_positions().into_iter().any(|coord| {
        Rotation::ALL.into_iter().any(|rotation| {
            let layout = definition.rotated_layout(rotation);
            validate(board, coord, layout.as_ref()).is_ok()
        })
    })
}
