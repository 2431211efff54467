//! Menu request and result models

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::ids::{ItemId, ListId};
use crate::error::{Error, Result};

/// Keep only items within `radius_km` of an origin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFilter {
    pub latitude: f64,
    pub longitude: f64,
    pub radius_km: f64,
}

/// Optional predicates applied on top of the eligibility rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MenuFilters {
    #[serde(default)]
    pub near: Option<GeoFilter>,
    /// Case-insensitive substring match on the item name
    #[serde(default)]
    pub name_contains: Option<String>,
}

/// A menu request. Constructed per call, never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuParams {
    pub list_ids: Vec<ListId>,
    pub count: usize,
    #[serde(default)]
    pub filters: MenuFilters,
    #[serde(default)]
    pub exclude: HashSet<ItemId>,
}

impl MenuParams {
    pub fn new(list_ids: impl IntoIterator<Item = ListId>, count: usize) -> Self {
        Self {
            list_ids: list_ids.into_iter().collect(),
            count,
            filters: MenuFilters::default(),
            exclude: HashSet::new(),
        }
    }

    #[must_use]
    pub fn excluding(mut self, ids: impl IntoIterator<Item = ItemId>) -> Self {
        self.exclude.extend(ids);
        self
    }

    #[must_use]
    pub fn with_filters(mut self, filters: MenuFilters) -> Self {
        self.filters = filters;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.list_ids.is_empty() {
            return Err(Error::InvalidInput("menu needs at least one list".into()));
        }
        if self.count == 0 {
            return Err(Error::InvalidInput("menu count must be positive".into()));
        }
        if let Some(near) = self.filters.near {
            if !(-90.0..=90.0).contains(&near.latitude) {
                return Err(Error::InvalidInput(format!(
                    "origin latitude out of range: {}",
                    near.latitude
                )));
            }
            if !(-180.0..=180.0).contains(&near.longitude) {
                return Err(Error::InvalidInput(format!(
                    "origin longitude out of range: {}",
                    near.longitude
                )));
            }
            if !(near.radius_km.is_finite() && near.radius_km >= 0.0) {
                return Err(Error::InvalidInput(format!(
                    "radius must be a non-negative distance (got {})",
                    near.radius_km
                )));
            }
        }
        Ok(())
    }

    /// List ids in request order with duplicates removed
    pub fn unique_list_ids(&self) -> Vec<ListId> {
        let mut seen = HashSet::new();
        self.list_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect()
    }
}

/// One selected item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MenuEntry {
    pub item_id: ItemId,
    pub list_id: ListId,
    pub name: String,
}

/// Result of a menu request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Menu {
    /// Selected items in draw order
    pub entries: Vec<MenuEntry>,
    pub requested: usize,
    /// Number of items actually selected; may be below `requested`
    pub satisfied: usize,
}

impl Menu {
    pub fn item_ids(&self) -> Vec<ItemId> {
        self.entries.iter().map(|entry| entry.item_id).collect()
    }

    pub const fn is_short(&self) -> bool {
        self.satisfied < self.requested
    }
}
