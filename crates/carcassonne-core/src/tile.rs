//! Tile definitions and rotation.
//!
//! A tile's printed features are described by a [`FeatureLayout`]: for each
//! [`FeatureKind`] a list of edge-groups, where one edge-group is the set of
//! sides that belong to the same physical road or city segment on the tile.
//! Rotating a tile relabels sides but never regroups them.

use crate::geometry::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Kind of feature that can run across tile edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FeatureKind {
    Road,
    City,
}

impl FeatureKind {
    /// All feature kinds
    pub const ALL: [FeatureKind; 2] = [FeatureKind::Road, FeatureKind::City];

    /// Points scored per edge a segment of this kind covers
    pub const fn segment_value(self) -> u32 {
        match self {
            FeatureKind::Road => 1,
            FeatureKind::City => 2,
        }
    }
}

impl fmt::Display for FeatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureKind::Road => f.write_str("road"),
            FeatureKind::City => f.write_str("city"),
        }
    }
}

/// Sides of one tile that form a single contiguous feature segment
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EdgeGroup(Vec<Direction>);

impl EdgeGroup {
    pub fn new(directions: impl Into<Vec<Direction>>) -> Self {
        Self(directions.into())
    }

    pub fn directions(&self) -> &[Direction] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Direction> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, direction: Direction) -> bool {
        self.0.contains(&direction)
    }

    /// Whether the two groups share at least one side
    pub fn intersects(&self, directions: &[Direction]) -> bool {
        directions.iter().any(|d| self.contains(*d))
    }

    fn rotated(&self, rotation: Rotation) -> Self {
        Self(self.0.iter().map(|d| d.rotated(rotation.steps())).collect())
    }
}

/// Feature layout of a tile: road and city edge-groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureLayout {
    #[serde(default)]
    pub roads: Vec<EdgeGroup>,
    #[serde(default)]
    pub cities: Vec<EdgeGroup>,
}

impl FeatureLayout {
    /// Create a layout from plain direction lists
    pub fn new(roads: &[&[Direction]], cities: &[&[Direction]]) -> Self {
        Self {
            roads: roads.iter().map(|g| EdgeGroup::new(*g)).collect(),
            cities: cities.iter().map(|g| EdgeGroup::new(*g)).collect(),
        }
    }

    /// Edge-groups of one kind
    pub fn groups(&self, kind: FeatureKind) -> &[EdgeGroup] {
        match kind {
            FeatureKind::Road => &self.roads,
            FeatureKind::City => &self.cities,
        }
    }

    /// The edge-group of `kind` that covers `direction`, if any
    pub fn group_at(&self, kind: FeatureKind, direction: Direction) -> Option<&EdgeGroup> {
        self.groups(kind).iter().find(|g| g.contains(direction))
    }

    /// Which feature, if any, reaches the given side.
    ///
    /// A side listed under both kinds counts as city.
    pub fn kind_at(&self, direction: Direction) -> Option<FeatureKind> {
        [FeatureKind::City, FeatureKind::Road]
            .into_iter()
            .find(|kind| self.group_at(*kind, direction).is_some())
    }

    /// Apply a rotation to every side, keeping the grouping intact
    pub fn rotated(&self, rotation: Rotation) -> Self {
        rotate(self, rotation)
    }
}

/// Rotate a layout clockwise.
///
/// Each side `d` becomes `Direction::ALL[(index(d) + steps) % 4]`.
pub fn rotate(layout: &FeatureLayout, rotation: Rotation) -> FeatureLayout {
    FeatureLayout {
        roads: layout.roads.iter().map(|g| g.rotated(rotation)).collect(),
        cities: layout.cities.iter().map(|g| g.rotated(rotation)).collect(),
    }
}

/// Kind of feature on a side of an optional layout (churches have none)
pub fn kind_at(layout: Option<&FeatureLayout>, direction: Direction) -> Option<FeatureKind> {
    layout.and_then(|l| l.kind_at(direction))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Invalid rotation {0}, expected 0, 90, 180 or 270")]
pub struct InvalidRotation(pub u16);

/// Clockwise rotation of a placed tile, serialized as degrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// All rotations in increasing order
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Number of clockwise quarter turns
    pub const fn steps(self) -> u8 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    /// Rotation from a number of quarter turns (taken modulo 4)
    pub const fn from_steps(steps: u8) -> Self {
        match steps % 4 {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub const fn degrees(self) -> u16 {
        self.steps() as u16 * 90
    }

    /// Apply `other` after `self`
    pub const fn then(self, other: Rotation) -> Self {
        Self::from_steps(self.steps() + other.steps())
    }
}

impl TryFrom<u16> for Rotation {
    type Error = InvalidRotation;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        match degrees {
            0 => Ok(Rotation::Deg0),
            90 => Ok(Rotation::Deg90),
            180 => Ok(Rotation::Deg180),
            270 => Ok(Rotation::Deg270),
            other => Err(InvalidRotation(other)),
        }
    }
}

impl From<Rotation> for u16 {
    fn from(rotation: Rotation) -> Self {
        rotation.degrees()
    }
}

/// Static description of a tile type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileDefinition {
    /// Unique name, also the key in the tile bag
    pub name: String,
    /// Pre-rotation layout; `None` for tiles without roads or cities
    pub layout: Option<FeatureLayout>,
    /// Doubles the points of every segment on this tile
    #[serde(default)]
    pub extra_points: bool,
    /// Tile shows a church
    #[serde(default)]
    pub has_church: bool,
}

impl TileDefinition {
    pub fn new(name: impl Into<String>, layout: Option<FeatureLayout>) -> Self {
        Self {
            name: name.into(),
            layout,
            extra_points: false,
            has_church: false,
        }
    }

    pub fn with_extra_points(mut self) -> Self {
        self.extra_points = true;
        self
    }

    pub fn with_church(mut self) -> Self {
        self.has_church = true;
        self
    }

    /// Layout after applying `rotation`
    pub fn rotated_layout(&self, rotation: Rotation) -> Option<FeatureLayout> {
        self.layout.as_ref().map(|layout| rotate(layout, rotation))
    }
}
