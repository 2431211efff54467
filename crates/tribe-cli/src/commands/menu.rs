use rand::rngs::StdRng;
use rand::SeedableRng;
use tribe_core::models::{GeoFilter, Menu, MenuFilters, MenuParams};
use tribe_core::ItemId;

use crate::commands::common::{
    format_menu_lines, normalize_identifier, parse_numbers, resolve_list, Service,
};
use crate::error::CliError;

#[derive(Default)]
pub struct MenuArgs<'a> {
    pub lists: &'a [String],
    pub count: usize,
    pub exclude: &'a [String],
    pub near: Option<&'a str>,
    pub name: Option<&'a str>,
    pub seed: Option<u64>,
}

pub fn parse_filters(near: Option<&str>, name: Option<&str>) -> Result<MenuFilters, CliError> {
    let near = near
        .map(|raw| {
            parse_numbers(raw, 3, "near").map(|values| GeoFilter {
                latitude: values[0],
                longitude: values[1],
                radius_km: values[2],
            })
        })
        .transpose()?;
    let name_contains = name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string);

    Ok(MenuFilters {
        near,
        name_contains,
    })
}

pub async fn build_params(args: &MenuArgs<'_>, service: &Service) -> Result<MenuParams, CliError> {
    let mut list_ids = Vec::with_capacity(args.lists.len());
    for query in args.lists {
        list_ids.push(resolve_list(service, query).await?.id);
    }

    let exclude = args
        .exclude
        .iter()
        .map(|raw| {
            normalize_identifier(raw)?
                .parse::<ItemId>()
                .map_err(|_| CliError::InvalidArgument(format!("'{raw}' is not an item ID")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let params = MenuParams::new(list_ids, args.count)
        .excluding(exclude)
        .with_filters(parse_filters(args.near, args.name)?);
    params.validate()?;
    Ok(params)
}

pub async fn run_menu(args: &MenuArgs<'_>, as_json: bool, service: &Service) -> Result<Menu, CliError> {
    let params = build_params(args, service).await?;
    let menu = match args.seed {
        Some(seed) => {
            let mut rng = StdRng::seed_from_u64(seed);
            service
                .generate_menu_with_rng(&params, &mut rng, service.deadline())
                .await?
        }
        None => service.generate_menu(&params, service.deadline()).await?,
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&menu)?);
    } else if menu.entries.is_empty() {
        println!("No eligible items.");
    } else {
        for line in format_menu_lines(&menu) {
            println!("{line}");
        }
    }

    Ok(menu)
}
