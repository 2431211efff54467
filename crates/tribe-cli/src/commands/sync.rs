use serde::Serialize;
use tribe_core::sync::{
    validate_transition, SyncAction, SyncSource, SyncStatus, SyncUpdate, TransitionTable,
};
use tribe_core::List;

use crate::commands::common::{format_timestamp, resolve_list, Service};
use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct SyncStatusReport {
    pub list_id: String,
    pub name: String,
    pub source: SyncSource,
    pub external_id: String,
    pub status: SyncStatus,
    pub last_sync_at: Option<String>,
    pub sync_version: u64,
    pub open_conflicts: usize,
    pub next_actions: Vec<SyncAction>,
}

pub async fn run_configure(
    list_query: &str,
    source: &str,
    external_id: &str,
    service: &Service,
) -> Result<List, CliError> {
    let source = source.parse::<SyncSource>()?;
    let list = resolve_list(service, list_query).await?;
    let list = service
        .apply_sync_action(
            &list.id,
            SyncAction::ConfigureSync,
            &SyncUpdate::configure(source, external_id.trim()),
            service.deadline(),
        )
        .await?;
    println!(
        "{} now syncs with {} (status: {})",
        list.name, list.sync.source, list.sync.status
    );
    Ok(list)
}

pub async fn run_apply(list_query: &str, action: &str, service: &Service) -> Result<List, CliError> {
    let action = action.parse::<SyncAction>()?;
    let list = resolve_list(service, list_query).await?;
    let before = list.sync.status;
    let list = service
        .apply_sync_action(&list.id, action, &SyncUpdate::default(), service.deadline())
        .await?;
    println!("{}: {before} -> {} ({action})", list.name, list.sync.status);
    Ok(list)
}

/// Check a transition against the table without touching any list.
pub fn run_check(from: &str, to: &str, action: &str) -> Result<(), CliError> {
    let from = from.parse::<SyncStatus>()?;
    let to = to.parse::<SyncStatus>()?;
    let action = action.parse::<SyncAction>()?;
    validate_transition(from, to, action)?;
    println!("{from} -> {to} via {action} is allowed");
    Ok(())
}

pub async fn status_report(list: &List, service: &Service) -> Result<SyncStatusReport, CliError> {
    let open_conflicts = service
        .list_conflicts(&list.id, true, service.deadline())
        .await?
        .len();

    Ok(SyncStatusReport {
        list_id: list.id.as_str(),
        name: list.name.clone(),
        source: list.sync.source,
        external_id: list.sync.external_id.clone(),
        status: list.sync.status,
        last_sync_at: list.sync.last_sync_at.map(format_timestamp),
        sync_version: list.sync_version,
        open_conflicts,
        next_actions: TransitionTable::global().actions_from(list.sync.status),
    })
}

pub async fn run_status(list_query: &str, as_json: bool, service: &Service) -> Result<(), CliError> {
    let list = resolve_list(service, list_query).await?;
    let report = status_report(&list, service).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("List: {} ({})", report.name, report.list_id);
    println!("Source: {}", report.source);
    if !report.external_id.is_empty() {
        println!("External ID: {}", report.external_id);
    }
    println!("Status: {}", report.status);
    println!(
        "Last sync: {}",
        report.last_sync_at.as_deref().unwrap_or("never")
    );
    println!("Open conflicts: {}", report.open_conflicts);
    let actions = report
        .next_actions
        .iter()
        .map(SyncAction::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    println!("Next actions: {actions}");
    Ok(())
}

pub async fn run_pull(list_query: &str, as_json: bool, service: &Service) -> Result<(), CliError> {
    let list = resolve_list(service, list_query).await?;
    let report = service.pull(&list.id, service.deadline()).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Pulled {} item(s) for {}: {} new conflict(s), status {}",
            report.fetched,
            list.name,
            report.conflicts.len(),
            report.status
        );
        for conflict_id in &report.conflicts {
            println!("  conflict {conflict_id}");
        }
    }

    Ok(())
}

pub async fn run_push(list_query: &str, service: &Service) -> Result<(), CliError> {
    let list = resolve_list(service, list_query).await?;
    let report = service.push(&list.id, service.deadline()).await?;
    println!(
        "Pushed {} item(s) for {}: status {}",
        report.pushed, list.name, report.status
    );
    Ok(())
}
