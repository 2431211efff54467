//! Eligibility rules for menu candidates.

use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::models::{ItemId, List, ListItem, MenuFilters};

/// An item paired with the settings it inherits from its list.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub item: ListItem,
    /// Effective selection weight, always positive
    pub weight: f64,
    /// Effective cooldown; `None` or zero means no restriction
    pub cooldown_days: Option<u32>,
}

impl Candidate {
    /// Apply the list's defaults where the item has no override.
    pub fn resolve(item: ListItem, list: &List) -> Self {
        let weight = item
            .weight
            .filter(|weight| weight.is_finite() && *weight > 0.0)
            .unwrap_or(list.default_weight);
        let cooldown_days = item.cooldown_days.or(list.cooldown_days);
        Self {
            item,
            weight,
            cooldown_days,
        }
    }

    /// Chosen less than `cooldown_days` ago.
    pub fn in_cooldown(&self, now: DateTime<Utc>) -> bool {
        match (self.item.last_chosen, self.cooldown_days) {
            (Some(last_chosen), Some(days)) if days > 0 => {
                now - last_chosen < Duration::days(i64::from(days))
            }
            _ => false,
        }
    }

    /// Outside the seasonal window, bounds inclusive.
    pub fn out_of_season(&self, now: DateTime<Utc>) -> bool {
        if !self.item.seasonal {
            return false;
        }
        match (self.item.start_date, self.item.end_date) {
            (Some(start), Some(end)) => now < start || now > end,
            _ => true,
        }
    }
}

/// Decides which candidates may be drawn at `now`.
#[derive(Debug, Clone, Copy)]
pub struct EligibilityFilter<'a> {
    now: DateTime<Utc>,
    exclusions: &'a HashSet<ItemId>,
    filters: &'a MenuFilters,
}

impl<'a> EligibilityFilter<'a> {
    pub const fn new(
        now: DateTime<Utc>,
        exclusions: &'a HashSet<ItemId>,
        filters: &'a MenuFilters,
    ) -> Self {
        Self {
            now,
            exclusions,
            filters,
        }
    }

    pub fn is_eligible(&self, candidate: &Candidate) -> bool {
        let item = &candidate.item;
        item.available
            && !self.exclusions.contains(&item.id)
            && !candidate.out_of_season(self.now)
            && !candidate.in_cooldown(self.now)
            && self.passes_filters(item)
    }

    /// Keep eligible candidates in their original order.
    pub fn eligible(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        let total = candidates.len();
        let eligible: Vec<_> = candidates
            .into_iter()
            .filter(|candidate| self.is_eligible(candidate))
            .collect();
        tracing::debug!(total, eligible = eligible.len(), "Filtered menu candidates");
        eligible
    }

    fn passes_filters(&self, item: &ListItem) -> bool {
        if let Some(near) = self.filters.near {
            let Some(location) = &item.location else {
                return false;
            };
            if location.distance_km(near.latitude, near.longitude) > near.radius_km {
                return false;
            }
        }
        if let Some(needle) = self.filters.name_contains.as_deref() {
            let needle = needle.trim().to_lowercase();
            if !needle.is_empty() && !item.name.to_lowercase().contains(&needle) {
                return false;
            }
        }
        true
    }
}
