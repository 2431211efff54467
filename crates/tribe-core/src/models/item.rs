//! List item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{ItemId, ListId};
use crate::error::{Error, Result};

/// Geographic location of an item; all parts are present together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub address: String,
}

impl Location {
    pub fn validate(&self) -> Result<()> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(Error::InvalidInput(format!(
                "latitude out of range: {}",
                self.latitude
            )));
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(Error::InvalidInput(format!(
                "longitude out of range: {}",
                self.longitude
            )));
        }
        if self.address.trim().is_empty() {
            return Err(Error::InvalidInput("address cannot be empty".into()));
        }
        Ok(())
    }

    /// Great-circle distance in kilometres (haversine)
    pub fn distance_km(&self, latitude: f64, longitude: f64) -> f64 {
        const EARTH_RADIUS_KM: f64 = 6371.0;
        let (lat1, lat2) = (self.latitude.to_radians(), latitude.to_radians());
        let d_lat = lat2 - lat1;
        let d_lng = (longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
    }
}

/// A single candidate entry in a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub id: ItemId,
    pub list_id: ListId,
    pub name: String,
    /// Selection weight; falls back to the list default when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    pub available: bool,
    pub seasonal: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    /// Overrides the list's cooldown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_days: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_chosen: Option<DateTime<Utc>>,
    pub chosen_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_used: Option<DateTime<Utc>>,
    pub use_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ListItem {
    /// Build an item from validated creation input
    pub fn new(list_id: ListId, input: NewListItem) -> Result<Self> {
        input.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: ItemId::new(),
            list_id,
            name: input.name.trim().to_string(),
            weight: input.weight,
            available: input.available,
            seasonal: input.seasonal,
            start_date: input.start_date,
            end_date: input.end_date,
            cooldown_days: input.cooldown_days,
            last_chosen: None,
            chosen_count: 0,
            last_used: None,
            use_count: 0,
            location: input.location,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Input for creating a list item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewListItem {
    pub name: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default = "default_available")]
    pub available: bool,
    #[serde(default)]
    pub seasonal: bool,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cooldown_days: Option<u32>,
    #[serde(default)]
    pub location: Option<Location>,
}

const fn default_available() -> bool {
    true
}

impl NewListItem {
    /// Minimal available, non-seasonal item
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            weight: None,
            available: true,
            seasonal: false,
            start_date: None,
            end_date: None,
            cooldown_days: None,
            location: None,
        }
    }

    #[must_use]
    pub const fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    #[must_use]
    pub const fn with_season(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.seasonal = true;
        self.start_date = Some(start);
        self.end_date = Some(end);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("item name cannot be empty".into()));
        }
        if let Some(weight) = self.weight {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(Error::InvalidInput(format!(
                    "item weight must be positive (got {weight})"
                )));
            }
        }
        if self.seasonal {
            match (self.start_date, self.end_date) {
                (Some(start), Some(end)) if start <= end => {}
                (Some(_), Some(_)) => {
                    return Err(Error::InvalidInput(
                        "seasonal start date must not be after end date".into(),
                    ))
                }
                _ => {
                    return Err(Error::InvalidInput(
                        "seasonal items need both start and end dates".into(),
                    ))
                }
            }
        }
        if let Some(location) = &self.location {
            location.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_item_new_defaults() {
        let item = ListItem::new(ListId::new(), NewListItem::named("Ramen bar")).unwrap();
        assert!(item.available);
        assert_eq!(item.chosen_count, 0);
        assert_eq!(item.use_count, 0);
        assert!(item.last_chosen.is_none());
    }

    #[test]
    fn test_item_rejects_non_positive_weight() {
        let input = NewListItem::named("Zoo").with_weight(-1.0);
        assert!(matches!(input.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_seasonal_requires_ordered_dates() {
        let now = Utc::now();
        let ok = NewListItem::named("Ice rink").with_season(now, now + Duration::days(30));
        assert!(ok.validate().is_ok());

        let reversed = NewListItem::named("Ice rink").with_season(now, now - Duration::days(1));
        assert!(reversed.validate().is_err());

        let mut missing = NewListItem::named("Ice rink");
        missing.seasonal = true;
        missing.start_date = Some(now);
        assert!(missing.validate().is_err());
    }

    #[test]
    fn test_location_validation() {
        let mut input = NewListItem::named("Pier");
        input.location = Some(Location {
            latitude: 120.0,
            longitude: 0.0,
            address: "Nowhere".into(),
        });
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_distance_km() {
        let paris = Location {
            latitude: 48.8566,
            longitude: 2.3522,
            address: "Paris".into(),
        };
        let london_km = paris.distance_km(51.5074, -0.1278);
        assert!((london_km - 343.5).abs() < 5.0, "{london_km}");
        assert!(paris.distance_km(48.8566, 2.3522) < 1e-9);
    }
}
