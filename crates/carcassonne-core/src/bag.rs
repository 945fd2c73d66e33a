//! The tile bag: remaining tiles per tile type.

use crate::game::GameError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tiles left to draw, keyed by tile name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileBag {
    counts: BTreeMap<String, u32>,
}

impl TileBag {
    /// Create a bag; names with a zero count are dropped
    pub fn new(counts: BTreeMap<String, u32>) -> Self {
        Self {
            counts: counts.into_iter().filter(|(_, count)| *count > 0).collect(),
        }
    }

    /// Draw one tile at random.
    ///
    /// Every remaining tile is equally likely, so a type with three copies
    /// left is three times as likely as a type with one.
    pub fn draw<R: Rng>(&self, rng: &mut R) -> Result<(String, TileBag), GameError> {
        let total = self.remaining();
        if total == 0 {
            return Err(GameError::EmptyBag);
        }

        let mut pick = rng.gen_range(0..total);
        for (name, count) in &self.counts {
            if pick < *count {
                let bag = self.take(name).ok_or(GameError::EmptyBag)?;
                return Ok((name.clone(), bag));
            }
            pick -= count;
        }
        Err(GameError::EmptyBag)
    }

    /// Remove one tile of the given type, if any is left
    pub fn take(&self, name: &str) -> Option<TileBag> {
        let mut counts = self.counts.clone();
        let count = counts.get_mut(name)?;
        *count -= 1;
        if *count == 0 {
            counts.remove(name);
        }
        Some(Self { counts })
    }

    /// Total number of tiles left
    pub fn remaining(&self) -> u32 {
        self.counts.values().sum()
    }

    /// Copies left of one tile type
    pub fn count(&self, name: &str) -> u32 {
        self.counts.get(name).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn counts(&self) -> &BTreeMap<String, u32> {
        &self.counts
    }
}
