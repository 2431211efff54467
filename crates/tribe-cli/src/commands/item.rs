use chrono::Utc;
use tribe_core::models::{Location, NewListItem};
use tribe_core::ListItem;

use crate::commands::common::{
    format_item_lines, join_words, parse_numbers, parse_season, resolve_item, resolve_list,
    Service,
};
use crate::error::CliError;

#[derive(Default)]
pub struct NewItemArgs<'a> {
    pub name: &'a [String],
    pub weight: Option<f64>,
    pub cooldown_days: Option<u32>,
    pub season_start: Option<&'a str>,
    pub season_end: Option<&'a str>,
    pub at: Option<&'a str>,
    pub address: Option<&'a str>,
    pub unavailable: bool,
}

impl NewItemArgs<'_> {
    pub fn to_input(&self) -> Result<NewListItem, CliError> {
        let name = join_words(self.name).ok_or(CliError::EmptyName)?;
        let mut input = NewListItem::named(name);
        input.weight = self.weight;
        input.cooldown_days = self.cooldown_days;
        input.available = !self.unavailable;

        if let (Some(start), Some(end)) = (self.season_start, self.season_end) {
            let (start, end) = parse_season(start, end)?;
            input = input.with_season(start, end);
        }

        if let (Some(at), Some(address)) = (self.at, self.address) {
            let coordinates = parse_numbers(at, 2, "at")?;
            input.location = Some(Location {
                latitude: coordinates[0],
                longitude: coordinates[1],
                address: address.trim().to_string(),
            });
        }

        input.validate()?;
        Ok(input)
    }
}

pub async fn run_add(
    list_query: &str,
    args: &NewItemArgs<'_>,
    service: &Service,
) -> Result<ListItem, CliError> {
    let input = args.to_input()?;
    let list = resolve_list(service, list_query).await?;
    let item = service.add_item(&list.id, input, service.deadline()).await?;
    println!("Added {} to {} ({})", item.name, list.name, item.id);
    Ok(item)
}

pub async fn run_show(list_query: &str, as_json: bool, service: &Service) -> Result<(), CliError> {
    let list = resolve_list(service, list_query).await?;
    let items = service.list_items(&list.id, service.deadline()).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if items.is_empty() {
        println!("{} has no items.", list.name);
    } else {
        for line in format_item_lines(&items, Utc::now()) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_use(item_query: &str, service: &Service) -> Result<ListItem, CliError> {
    let item = resolve_item(service, item_query).await?;
    let item = service.record_item_use(&item.id, service.deadline()).await?;
    println!("Recorded use of {} ({} total)", item.name, item.use_count);
    Ok(item)
}

pub async fn run_set_available(
    item_query: &str,
    available: bool,
    service: &Service,
) -> Result<ListItem, CliError> {
    let item = resolve_item(service, item_query).await?;
    let item = service
        .set_item_available(&item.id, available, service.deadline())
        .await?;
    let state = if available { "available" } else { "unavailable" };
    println!("{} is now {state}", item.name);
    Ok(item)
}
