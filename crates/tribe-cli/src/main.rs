//! tribe CLI - shared lists, sync state and weighted menus from the terminal

mod cli;
mod commands;
mod error;


use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands, ConflictCommands, ItemCommands, ListCommands, SyncCommands};
use crate::commands::common::{
    load_config, open_service, resolve_config_path, resolve_db_path, Service,
};
use crate::commands::completions::run_completions;
use crate::commands::config::run_config;
use crate::commands::conflict::NewConflictArgs;
use crate::commands::item::NewItemArgs;
use crate::commands::list::NewListArgs;
use crate::commands::menu::MenuArgs;
use crate::commands::{conflict, item, list, menu, sync};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    dotenvy::dotenv().ok();

    let mut filter = EnvFilter::from_default_env();
    if let Ok(directive) = "tribe_core=info".parse() {
        filter = filter.add_directive(directive);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config_path = resolve_config_path(cli.config);

    match cli.command {
        Commands::Config { command } => run_config(command, &config_path, cli.db_path),
        Commands::Completions { shell, output } => run_completions(shell, output.as_deref()),
        Commands::Sync {
            command: SyncCommands::Check { from, to, action },
        } => sync::run_check(&from, &to, &action),
        command => {
            let config = load_config(&config_path)?;
            let db_path = resolve_db_path(cli.db_path, &config);
            let service = open_service(&db_path, config).await?;
            dispatch(command, &service).await
        }
    }
}

async fn dispatch(command: Commands, service: &Service) -> Result<(), CliError> {
    match command {
        Commands::List { command } => run_list_command(command, service).await,
        Commands::Item { command } => run_item_command(command, service).await,
        Commands::Sync { command } => run_sync_command(command, service).await,
        Commands::Conflict { command } => run_conflict_command(command, service).await,
        Commands::Menu {
            lists,
            count,
            exclude,
            near,
            name,
            seed,
            json,
        } => {
            let args = MenuArgs {
                lists: &lists,
                count,
                exclude: &exclude,
                near: near.as_deref(),
                name: name.as_deref(),
                seed,
            };
            menu::run_menu(&args, json, service).await.map(|_| ())
        }
        Commands::Config { .. } | Commands::Completions { .. } => Ok(()),
    }
}

async fn run_list_command(command: ListCommands, service: &Service) -> Result<(), CliError> {
    match command {
        ListCommands::New {
            name,
            list_type,
            visibility,
            weight,
            max_items,
            cooldown_days,
        } => {
            let args = NewListArgs {
                name: &name,
                list_type: &list_type,
                visibility: &visibility,
                weight,
                max_items,
                cooldown_days,
            };
            list::run_new(&args, service).await.map(|_| ())
        }
        ListCommands::Show { json } => list::run_show(json, service).await,
        ListCommands::Delete { list } => list::run_delete(&list, service).await,
    }
}

async fn run_item_command(command: ItemCommands, service: &Service) -> Result<(), CliError> {
    match command {
        ItemCommands::Add {
            list,
            name,
            weight,
            cooldown_days,
            season_start,
            season_end,
            at,
            address,
            unavailable,
        } => {
            let args = NewItemArgs {
                name: &name,
                weight,
                cooldown_days,
                season_start: season_start.as_deref(),
                season_end: season_end.as_deref(),
                at: at.as_deref(),
                address: address.as_deref(),
                unavailable,
            };
            item::run_add(&list, &args, service).await.map(|_| ())
        }
        ItemCommands::Show { list, json } => item::run_show(&list, json, service).await,
        ItemCommands::Use { item } => item::run_use(&item, service).await.map(|_| ()),
        ItemCommands::Enable { item } => item::run_set_available(&item, true, service)
            .await
            .map(|_| ()),
        ItemCommands::Disable { item } => item::run_set_available(&item, false, service)
            .await
            .map(|_| ()),
    }
}

async fn run_sync_command(command: SyncCommands, service: &Service) -> Result<(), CliError> {
    match command {
        SyncCommands::Configure {
            list,
            source,
            external_id,
        } => sync::run_configure(&list, &source, &external_id, service)
            .await
            .map(|_| ()),
        SyncCommands::Apply { list, action } => {
            sync::run_apply(&list, &action, service).await.map(|_| ())
        }
        SyncCommands::Check { from, to, action } => sync::run_check(&from, &to, &action),
        SyncCommands::Status { list, json } => sync::run_status(&list, json, service).await,
        SyncCommands::Pull { list, json } => sync::run_pull(&list, json, service).await,
        SyncCommands::Push { list } => sync::run_push(&list, service).await,
    }
}

async fn run_conflict_command(command: ConflictCommands, service: &Service) -> Result<(), CliError> {
    match command {
        ConflictCommands::Show { list, open, json } => {
            conflict::run_show(&list, open, json, service).await
        }
        ConflictCommands::Add {
            list,
            conflict_type,
            local,
            remote,
            item,
        } => {
            let args = NewConflictArgs {
                list: &list,
                conflict_type: &conflict_type,
                local: &local,
                remote: &remote,
                item: item.as_deref(),
            };
            conflict::run_add(&args, service).await.map(|_| ())
        }
        ConflictCommands::Resolve {
            conflict,
            resolution,
            auto,
        } => conflict::run_resolve(&conflict, &resolution, auto, service)
            .await
            .map(|_| ()),
    }
}
