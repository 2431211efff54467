use tribe_core::models::{NewConflict, SyncConflict};
use tribe_core::sync::{Resolution, ResolutionMode};
use tribe_core::ConflictId;

use crate::commands::common::{
    format_conflict_lines, join_words, normalize_identifier, parse_json_arg, resolve_item,
    resolve_list, Service,
};
use crate::error::CliError;

pub async fn run_show(
    list_query: &str,
    open_only: bool,
    as_json: bool,
    service: &Service,
) -> Result<(), CliError> {
    let list = resolve_list(service, list_query).await?;
    let conflicts = service
        .list_conflicts(&list.id, open_only, service.deadline())
        .await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&conflicts)?);
    } else if conflicts.is_empty() {
        println!("No conflicts for {}.", list.name);
    } else {
        for line in format_conflict_lines(&conflicts) {
            println!("{line}");
        }
    }

    Ok(())
}

pub struct NewConflictArgs<'a> {
    pub list: &'a str,
    pub conflict_type: &'a str,
    pub local: &'a str,
    pub remote: &'a str,
    pub item: Option<&'a str>,
}

pub async fn run_add(args: &NewConflictArgs<'_>, service: &Service) -> Result<SyncConflict, CliError> {
    let local_data = parse_json_arg(args.local, "local")?;
    let remote_data = parse_json_arg(args.remote, "remote")?;
    let list = resolve_list(service, args.list).await?;
    let item_id = match args.item {
        Some(query) => Some(resolve_item(service, query).await?.id),
        None => None,
    };

    let conflict = service
        .create_conflict(
            NewConflict {
                list_id: list.id,
                item_id,
                conflict_type: args.conflict_type.trim().to_string(),
                local_data,
                remote_data,
            },
            service.deadline(),
        )
        .await?;
    println!("Recorded conflict {} on {}", conflict.id, list.name);
    Ok(conflict)
}

pub async fn run_resolve(
    conflict: &str,
    resolution: &[String],
    auto: bool,
    service: &Service,
) -> Result<Resolution, CliError> {
    let conflict_id = normalize_identifier(conflict)?
        .parse::<ConflictId>()
        .map_err(|_| CliError::InvalidArgument(format!("'{conflict}' is not a conflict ID")))?;
    let resolution = join_words(resolution).ok_or(CliError::EmptyResolution)?;
    let mode = if auto {
        ResolutionMode::Auto
    } else {
        ResolutionMode::Manual
    };

    let outcome = service
        .resolve_conflict(&conflict_id, &resolution, mode, service.deadline())
        .await?;
    println!(
        "Resolved conflict {}; {} open conflict(s) left, list status {}",
        outcome.conflict.id, outcome.remaining_open, outcome.list_status
    );
    Ok(outcome)
}
