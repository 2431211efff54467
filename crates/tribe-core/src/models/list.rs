//! List model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::ids::ListId;
use crate::error::{Error, Result};
use crate::sync::SyncConfig;

/// Kind of candidates a list holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    #[default]
    General,
    Location,
    Activity,
    Interest,
    ExternalMap,
}

impl ListType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Location => "location",
            Self::Activity => "activity",
            Self::Interest => "interest",
            Self::ExternalMap => "external_map",
        }
    }
}

impl fmt::Display for ListType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ListType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "general" => Ok(Self::General),
            "location" => Ok(Self::Location),
            "activity" => Ok(Self::Activity),
            "interest" => Ok(Self::Interest),
            "external_map" => Ok(Self::ExternalMap),
            _ => Err(Error::InvalidInput(format!("unknown list type '{s}'"))),
        }
    }
}

/// Who can see a list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Private,
    Shared,
    Public,
}

impl Visibility {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Private => "private",
            Self::Shared => "shared",
            Self::Public => "public",
        }
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "private" => Ok(Self::Private),
            "shared" => Ok(Self::Shared),
            "public" => Ok(Self::Public),
            _ => Err(Error::InvalidInput(format!("unknown visibility '{s}'"))),
        }
    }
}

/// A named collection of candidate items
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct List {
    /// Unique identifier
    pub id: ListId,
    pub list_type: ListType,
    pub name: String,
    pub visibility: Visibility,
    /// Weight applied to items without their own weight (> 0)
    pub default_weight: f64,
    /// Upper bound on items drawn from this list per menu
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u32>,
    /// Days an item stays ineligible after being chosen
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cooldown_days: Option<u32>,
    /// Sync fields, mutated only through the sync state machine
    pub sync: SyncConfig,
    /// Bumped on every committed sync change
    pub sync_version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Soft delete flag
    pub is_deleted: bool,
}

impl List {
    /// Build a list from validated creation input
    pub fn new(input: NewList) -> Result<Self> {
        input.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: ListId::new(),
            list_type: input.list_type,
            name: input.name.trim().to_string(),
            visibility: input.visibility,
            default_weight: input.default_weight,
            max_items: input.max_items,
            cooldown_days: input.cooldown_days,
            sync: SyncConfig::default(),
            sync_version: 0,
            created_at: now,
            updated_at: now,
            is_deleted: false,
        })
    }
}

/// Input for creating a list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewList {
    pub name: String,
    #[serde(default)]
    pub list_type: ListType,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default = "default_weight")]
    pub default_weight: f64,
    #[serde(default)]
    pub max_items: Option<u32>,
    #[serde(default)]
    pub cooldown_days: Option<u32>,
}

const fn default_weight() -> f64 {
    1.0
}

impl NewList {
    /// Minimal input with defaults for everything but the name
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            list_type: ListType::default(),
            visibility: Visibility::default(),
            default_weight: default_weight(),
            max_items: None,
            cooldown_days: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidInput("list name cannot be empty".into()));
        }
        if !(self.default_weight.is_finite() && self.default_weight > 0.0) {
            return Err(Error::InvalidInput(format!(
                "default weight must be positive (got {})",
                self.default_weight
            )));
        }
        if self.max_items == Some(0) {
            return Err(Error::InvalidInput("max items must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::SyncStatus;

    #[test]
    fn test_list_new_starts_unsynced() {
        let list = List::new(NewList::named("  Dinner spots ")).unwrap();
        assert_eq!(list.name, "Dinner spots");
        assert_eq!(list.sync.status, SyncStatus::None);
        assert_eq!(list.sync_version, 0);
        assert!(!list.is_deleted);
    }

    #[test]
    fn test_list_rejects_bad_weight() {
        let mut input = NewList::named("Films");
        input.default_weight = 0.0;
        assert!(matches!(List::new(input.clone()), Err(Error::InvalidInput(_))));
        input.default_weight = f64::NAN;
        assert!(List::new(input).is_err());
    }

    #[test]
    fn test_list_rejects_zero_max_items() {
        let mut input = NewList::named("Hikes");
        input.max_items = Some(0);
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_list_type_parse() {
        assert_eq!("external-map".parse::<ListType>().unwrap(), ListType::ExternalMap);
        assert!("podcast".parse::<ListType>().is_err());
        assert_eq!("Shared".parse::<Visibility>().unwrap(), Visibility::Shared);
    }
}
