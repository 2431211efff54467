use tribe_core::models::{ListType, NewList, Visibility};
use tribe_core::List;

use crate::commands::common::{format_list_lines, join_words, resolve_list, Service};
use crate::error::CliError;

pub struct NewListArgs<'a> {
    pub name: &'a [String],
    pub list_type: &'a str,
    pub visibility: &'a str,
    pub weight: f64,
    pub max_items: Option<u32>,
    pub cooldown_days: Option<u32>,
}

impl NewListArgs<'_> {
    pub fn to_input(&self) -> Result<NewList, CliError> {
        let name = join_words(self.name).ok_or(CliError::EmptyName)?;
        let input = NewList {
            name,
            list_type: self.list_type.parse::<ListType>()?,
            visibility: self.visibility.parse::<Visibility>()?,
            default_weight: self.weight,
            max_items: self.max_items,
            cooldown_days: self.cooldown_days,
        };
        input.validate()?;
        Ok(input)
    }
}

pub async fn run_new(args: &NewListArgs<'_>, service: &Service) -> Result<List, CliError> {
    let list = service
        .create_list(args.to_input()?, service.deadline())
        .await?;
    println!("Created list {} ({})", list.name, list.id);
    Ok(list)
}

pub async fn run_show(as_json: bool, service: &Service) -> Result<(), CliError> {
    let lists = service.lists(service.deadline()).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&lists)?);
    } else if lists.is_empty() {
        println!("No lists yet. Create one with `tribe list new <NAME>`.");
    } else {
        for line in format_list_lines(&lists) {
            println!("{line}");
        }
    }

    Ok(())
}

pub async fn run_delete(query: &str, service: &Service) -> Result<(), CliError> {
    let list = resolve_list(service, query).await?;
    service.delete_list(&list.id, service.deadline()).await?;
    println!("Deleted list {} ({})", list.name, list.id);
    Ok(())
}
