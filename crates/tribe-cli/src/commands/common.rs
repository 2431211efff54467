use std::env;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tribe_core::db::LibSqlStore;
use tribe_core::models::{Menu, SyncConflict};
use tribe_core::{List, ListItem, TribeConfig, TribeService};

use crate::error::CliError;

pub type Service = TribeService<LibSqlStore>;

const SHORT_ID_LEN: usize = 13;

pub fn resolve_config_path(cli_config_path: Option<PathBuf>) -> PathBuf {
    cli_config_path
        .or_else(|| env::var_os("TRIBE_CONFIG").map(PathBuf::from))
        .unwrap_or_else(default_config_path)
}

pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tribe")
        .join("config.json")
}

pub fn load_config(path: &Path) -> Result<TribeConfig, CliError> {
    Ok(TribeConfig::load_from_path(path)?)
}

/// Flag, then `TRIBE_DB_PATH`, then the config file, then the data dir.
pub fn resolve_db_path(cli_db_path: Option<PathBuf>, config: &TribeConfig) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("TRIBE_DB_PATH").map(PathBuf::from))
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tribe")
        .join("tribe.db")
}

pub async fn open_service(path: &Path, config: TribeConfig) -> Result<Service, CliError> {
    Ok(TribeService::open_path(path, config).await?)
}

pub fn normalize_identifier(id: &str) -> Result<String, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyId)
    } else {
        Ok(trimmed.to_ascii_lowercase())
    }
}

pub fn join_words(parts: &[String]) -> Option<String> {
    let joined = parts.join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Resolve a list by full ID or unique ID prefix.
pub async fn resolve_list(service: &Service, query: &str) -> Result<List, CliError> {
    let query = normalize_identifier(query)?;
    let lists = service.lists(service.deadline()).await?;
    pick_unique(&query, lists, |list| list.id.as_str())
        .map_err(|matches| unresolved(&query, &matches, CliError::ListNotFound))
}

/// Resolve an item by full ID or unique ID prefix across every live list.
pub async fn resolve_item(service: &Service, query: &str) -> Result<ListItem, CliError> {
    let query = normalize_identifier(query)?;
    let mut items = Vec::new();
    for list in service.lists(service.deadline()).await? {
        items.extend(service.list_items(&list.id, service.deadline()).await?);
    }
    pick_unique(&query, items, |item| item.id.as_str())
        .map_err(|matches| unresolved(&query, &matches, CliError::ItemNotFound))
}

/// The single candidate whose ID starts with `query`, or every matching ID.
fn pick_unique<T>(
    query: &str,
    candidates: Vec<T>,
    id_of: impl Fn(&T) -> String,
) -> Result<T, Vec<String>> {
    let mut matching = candidates
        .into_iter()
        .filter(|candidate| id_of(candidate).starts_with(query))
        .collect::<Vec<_>>();

    if matching.len() == 1 {
        Ok(matching.remove(0))
    } else {
        Err(matching.iter().map(id_of).collect())
    }
}

fn unresolved(query: &str, matches: &[String], not_found: fn(String) -> CliError) -> CliError {
    if matches.is_empty() {
        return not_found(query.to_string());
    }

    let options = matches
        .iter()
        .take(3)
        .map(|id| short_id(id))
        .collect::<Vec<_>>()
        .join(", ");
    CliError::AmbiguousId(format!(
        "ID prefix '{query}' is ambiguous; matches: {options}"
    ))
}

pub fn short_id(id: &str) -> String {
    id.chars().take(SHORT_ID_LEN).collect()
}

pub fn parse_json_arg(raw: &str, name: &str) -> Result<serde_json::Value, CliError> {
    serde_json::from_str(raw)
        .map_err(|error| CliError::InvalidArgument(format!("--{name} is not valid JSON: {error}")))
}

/// Parse `count` comma-separated numbers, e.g. `52.5,13.4`.
pub fn parse_numbers(raw: &str, count: usize, name: &str) -> Result<Vec<f64>, CliError> {
    let values = raw
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| CliError::InvalidArgument(format!("--{name} expects numbers, got '{raw}'")))?;

    if values.len() == count {
        Ok(values)
    } else {
        Err(CliError::InvalidArgument(format!(
            "--{name} expects {count} comma-separated values, got '{raw}'"
        )))
    }
}

/// Season bounds cover whole days: the start at midnight, the end at its last second.
pub fn parse_season(start: &str, end: &str) -> Result<(DateTime<Utc>, DateTime<Utc>), CliError> {
    let start = parse_date(start, "season-start")?.and_time(NaiveTime::MIN);
    let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
    let end = parse_date(end, "season-end")?.and_time(end_of_day);
    Ok((start.and_utc(), end.and_utc()))
}

fn parse_date(raw: &str, name: &str) -> Result<NaiveDate, CliError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| CliError::InvalidArgument(format!("--{name} expects YYYY-MM-DD, got '{raw}'")))
}

pub fn format_list_lines(lists: &[List]) -> Vec<String> {
    lists
        .iter()
        .map(|list| {
            let mut line = format!(
                "{}  {:<12}  {}  [{} | sync {}]",
                short_id(&list.id.as_str()),
                list.list_type.as_str(),
                list.name,
                list.visibility.as_str(),
                list.sync.status.as_str(),
            );
            if let Some(max_items) = list.max_items {
                line.push_str(&format!("  max={max_items}"));
            }
            if let Some(cooldown) = list.cooldown_days {
                line.push_str(&format!("  cooldown={cooldown}d"));
            }
            line
        })
        .collect()
}

pub fn format_item_lines(items: &[ListItem], now: DateTime<Utc>) -> Vec<String> {
    let now_ms = now.timestamp_millis();
    items
        .iter()
        .map(|item| {
            let weight = item
                .weight
                .map_or_else(|| "list".to_string(), |weight| format!("{weight}"));
            let last_chosen = item.last_chosen.map_or_else(
                || "never".to_string(),
                |at| format_relative_time(at.timestamp_millis(), now_ms),
            );
            let mut line = format!(
                "{}  {}  weight={weight}  chosen={} ({last_chosen})  used={}",
                short_id(&item.id.as_str()),
                item.name,
                item.chosen_count,
                item.use_count,
            );
            if !item.available {
                line.push_str("  [unavailable]");
            }
            if let (true, Some(start), Some(end)) = (item.seasonal, item.start_date, item.end_date) {
                line.push_str(&format!(
                    "  [season {} to {}]",
                    start.format("%Y-%m-%d"),
                    end.format("%Y-%m-%d")
                ));
            }
            if let Some(location) = &item.location {
                line.push_str(&format!("  @ {}", location.address));
            }
            line
        })
        .collect()
}

pub fn format_conflict_lines(conflicts: &[SyncConflict]) -> Vec<String> {
    conflicts
        .iter()
        .map(|conflict| {
            let state = match (&conflict.resolution, conflict.resolved_at) {
                (Some(resolution), Some(at)) => {
                    format!("resolved {} ({resolution})", format_timestamp(at))
                }
                _ => "open".to_string(),
            };
            let item = conflict
                .item_id
                .map_or_else(String::new, |id| format!("  item={}", short_id(&id.as_str())));
            format!(
                "{}  {:<8}  {}  {state}{item}",
                conflict.id,
                conflict.conflict_type,
                format_timestamp(conflict.created_at),
            )
        })
        .collect()
}

pub fn format_menu_lines(menu: &Menu) -> Vec<String> {
    let mut lines = menu
        .entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            format!(
                "{}. {}  ({})",
                index + 1,
                entry.name,
                short_id(&entry.item_id.as_str())
            )
        })
        .collect::<Vec<_>>();

    if menu.is_short() {
        lines.push(format!(
            "Only {} of {} requested items were eligible.",
            menu.satisfied, menu.requested
        ));
    }
    lines
}

pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
