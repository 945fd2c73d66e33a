//! Tile catalog: the set of tile types in a game and how many of each.
//!
//! The catalog is data. [`TileCatalog::standard`] builds the 72-tile base
//! set; [`TileCatalog::from_json`] loads and validates a custom one.

use crate::bag::TileBag;
use crate::geometry::Direction;
use crate::tile::{FeatureLayout, TileDefinition};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

/// Name of the tile placed at the origin in the standard set
pub const STANDARD_STARTING_TILE: &str = "road_top_bottom_town_right";

/// Errors raised while loading tile data
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid catalog JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate tile name: {0}")]
    DuplicateName(String),

    #[error("Tile {0} has an empty edge-group")]
    EmptyEdgeGroup(String),

    #[error("Tile {name} lists side {direction} more than once")]
    RepeatedDirection { name: String, direction: Direction },

    #[error("Tile {0} has a count of zero")]
    ZeroCount(String),

    #[error("Starting tile {0} is not in the catalog")]
    MissingStartingTile(String),
}

/// A tile definition together with its number of copies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(flatten)]
    pub definition: TileDefinition,
    pub count: u32,
}

/// All tile types available in a game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileCatalog {
    /// Tile placed at the origin when the game starts
    pub starting_tile: String,
    pub tiles: Vec<CatalogEntry>,
}

impl TileCatalog {
    /// Parse and validate a catalog
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let catalog: TileCatalog = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Check the catalog for malformed tiles
    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut names = HashSet::new();
        for entry in &self.tiles {
            let name = &entry.definition.name;
            if !names.insert(name.as_str()) {
                return Err(CatalogError::DuplicateName(name.clone()));
            }
            if entry.count == 0 {
                return Err(CatalogError::ZeroCount(name.clone()));
            }
            if let Some(layout) = &entry.definition.layout {
                validate_layout(name, layout)?;
            }
        }

        if !names.contains(self.starting_tile.as_str()) {
            return Err(CatalogError::MissingStartingTile(self.starting_tile.clone()));
        }
        Ok(())
    }

    pub fn definitions(&self) -> impl Iterator<Item = &TileDefinition> {
        self.tiles.iter().map(|entry| &entry.definition)
    }

    /// Look up a tile type by name
    pub fn definition(&self, name: &str) -> Option<&TileDefinition> {
        self.definitions().find(|definition| definition.name == name)
    }

    /// Total number of tiles, the starting tile included
    pub fn total_tiles(&self) -> u32 {
        self.tiles.iter().map(|entry| entry.count).sum()
    }

    /// A full bag holding every tile of the catalog
    pub fn bag(&self) -> TileBag {
        let counts: BTreeMap<String, u32> = self
            .tiles
            .iter()
            .map(|entry| (entry.definition.name.clone(), entry.count))
            .collect();
        TileBag::new(counts)
    }

    /// The 72-tile base set
    pub fn standard() -> Self {
        use Direction::{Bottom, Left, Right, Top};

        let tiles = vec![
            entry(church("church_road_bottom", &[&[Bottom]]), 2),
            entry(church("church", &[]), 4),
            entry(
                town("town_all_sides_shield", &[], &[&[Top, Right, Bottom, Left]])
                    .with_extra_points(),
                1,
            ),
            entry(town(STANDARD_STARTING_TILE, &[&[Top, Bottom]], &[&[Right]]), 4),
            entry(town("town_top", &[], &[&[Top]]), 5),
            entry(town("town_left_right_shield", &[], &[&[Left, Right]]).with_extra_points(), 2),
            entry(town("town_left_right", &[], &[&[Left, Right]]), 1),
            entry(town("towns_left_right", &[], &[&[Left], &[Right]]), 3),
            entry(town("towns_right_bottom", &[], &[&[Right], &[Bottom]]), 2),
            entry(town("town_top_road_right_bottom", &[&[Right, Bottom]], &[&[Top]]), 3),
            entry(town("town_top_road_bottom_left", &[&[Bottom, Left]], &[&[Top]]), 3),
            entry(
                town("town_top_crossing", &[&[Right], &[Bottom], &[Left]], &[&[Top]]),
                3,
            ),
            entry(town("town_top_left_shield", &[], &[&[Top, Left]]).with_extra_points(), 2),
            entry(town("town_top_left", &[], &[&[Top, Left]]), 3),
            entry(
                town("town_top_left_road_right_bottom_shield", &[&[Right, Bottom]], &[&[Top, Left]])
                    .with_extra_points(),
                2,
            ),
            entry(
                town("town_top_left_road_right_bottom", &[&[Right, Bottom]], &[&[Top, Left]]),
                3,
            ),
            entry(
                town("town_top_right_left_shield", &[], &[&[Top, Right, Left]]).with_extra_points(),
                1,
            ),
            entry(town("town_top_right_left", &[], &[&[Top, Right, Left]]), 3),
            entry(
                town("town_top_right_left_road_bottom_shield", &[&[Bottom]], &[&[Top, Right, Left]])
                    .with_extra_points(),
                2,
            ),
            entry(
                town("town_top_right_left_road_bottom", &[&[Bottom]], &[&[Top, Right, Left]]),
                1,
            ),
            entry(town("road_top_bottom", &[&[Top, Bottom]], &[]), 8),
            entry(town("road_bottom_left", &[&[Bottom, Left]], &[]), 9),
            entry(town("crossing_right_bottom_left", &[&[Right], &[Bottom], &[Left]], &[]), 4),
            entry(town("crossing_all_sides", &[&[Top], &[Right], &[Bottom], &[Left]], &[]), 1),
        ];

        Self {
            starting_tile: STANDARD_STARTING_TILE.to_string(),
            tiles,
        }
    }
}

impl Default for TileCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

fn entry(definition: TileDefinition, count: u32) -> CatalogEntry {
    CatalogEntry { definition, count }
}

fn town(name: &str, roads: &[&[Direction]], cities: &[&[Direction]]) -> TileDefinition {
    TileDefinition::new(name, Some(FeatureLayout::new(roads, cities)))
}

fn church(name: &str, roads: &[&[Direction]]) -> TileDefinition {
    let layout = (!roads.is_empty()).then(|| FeatureLayout::new(roads, &[]));
    TileDefinition::new(name, layout).with_church()
}

fn validate_layout(name: &str, layout: &FeatureLayout) -> Result<(), CatalogError> {
    let mut seen = HashSet::new();
    for group in layout.roads.iter().chain(layout.cities.iter()) {
        if group.is_empty() {
            return Err(CatalogError::EmptyEdgeGroup(name.to_string()));
        }
        for direction in group.iter() {
            if !seen.insert(direction) {
                return Err(CatalogError::RepeatedDirection {
                    name: name.to_string(),
                    direction,
                });
            }
        }
    }
    Ok(())
}
