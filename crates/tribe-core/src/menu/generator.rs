//! Menu generation: load, filter, draw, record.

use std::collections::HashMap;

use chrono::Utc;
use rand::Rng;

use super::eligibility::{Candidate, EligibilityFilter};
use super::selector::WeightedSelector;
use crate::deadline::Deadline;
use crate::error::{Error, Result};
use crate::models::{List, ListId, Menu, MenuEntry, MenuParams};
use crate::store::Storage;

/// Draws menus from stored lists. Never touches sync state.
pub struct MenuGenerator<'a, S> {
    store: &'a S,
}

impl<'a, S: Storage> MenuGenerator<'a, S> {
    pub const fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Draw a menu and record the selection on each chosen item.
    ///
    /// Fewer eligible items than requested is not an error; `satisfied`
    /// reports how many were drawn.
    pub async fn generate_menu<R: Rng>(
        &self,
        params: &MenuParams,
        rng: &mut R,
        deadline: Deadline,
    ) -> Result<Menu> {
        params.validate()?;
        let list_ids = params.unique_list_ids();

        let mut lists: HashMap<ListId, List> = HashMap::with_capacity(list_ids.len());
        for list_id in &list_ids {
            let list = deadline
                .run("generate_menu", self.store.get_list(list_id))
                .await?
                .ok_or_else(|| Error::NotFound(format!("list {list_id}")))?;
            lists.insert(*list_id, list);
        }
        let items = deadline
            .run("generate_menu", self.store.get_items(&list_ids))
            .await?;

        let candidates: Vec<Candidate> = items
            .into_iter()
            .filter_map(|item| {
                let list = lists.get(&item.list_id)?;
                Some(Candidate::resolve(item, list))
            })
            .collect();

        let now = Utc::now();
        let eligible =
            EligibilityFilter::new(now, &params.exclude, &params.filters).eligible(candidates);

        let limit = lists
            .values()
            .filter_map(|list| list.max_items)
            .min()
            .map_or(params.count, |max| params.count.min(max as usize));
        let chosen = WeightedSelector::new(&mut *rng).select(eligible, limit);

        deadline.check("generate_menu")?;
        for candidate in &chosen {
            self.store
                .update_item_stats(&candidate.item.id, true, now)
                .await?;
        }

        let entries: Vec<MenuEntry> = chosen
            .into_iter()
            .map(|candidate| MenuEntry {
                item_id: candidate.item.id,
                list_id: candidate.item.list_id,
                name: candidate.item.name,
            })
            .collect();

        tracing::info!(
            lists = list_ids.len(),
            requested = params.count,
            satisfied = entries.len(),
            "Menu generated"
        );

        Ok(Menu {
            satisfied: entries.len(),
            requested: params.count,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemId, ListItem, NewList, NewListItem};
    use crate::store::{Catalog, MemoryStore};
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    async fn list_with_items(store: &MemoryStore, input: NewList, names: &[&str]) -> (List, Vec<ListItem>) {
        let list = store.create_list(input).await.unwrap();
        let mut items = Vec::new();
        for name in names {
            items.push(
                store
                    .create_item(&list.id, NewListItem::named(*name))
                    .await
                    .unwrap(),
            );
        }
        (list, items)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn draws_distinct_items_and_counts_them() {
        let store = MemoryStore::new();
        let (list, _) = list_with_items(&store, NewList::named("Games"), &["Go", "Chess", "Shogi"]).await;
        let mut rng = StdRng::seed_from_u64(3);

        let menu = MenuGenerator::new(&store)
            .generate_menu(&MenuParams::new([list.id], 2), &mut rng, Deadline::none())
            .await
            .unwrap();

        assert_eq!(menu.satisfied, 2);
        assert_eq!(menu.requested, 2);
        let ids: HashSet<ItemId> = menu.item_ids().into_iter().collect();
        assert_eq!(ids.len(), 2);
        for id in &ids {
            let item = store.get_item(id).await.unwrap().unwrap();
            assert_eq!(item.chosen_count, 1);
            assert!(item.last_chosen.is_some());
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn all_items_in_cooldown_is_an_empty_menu() {
        let store = MemoryStore::new();
        let mut input = NewList::named("Dinners");
        input.cooldown_days = Some(3);
        let (list, items) = list_with_items(&store, input, &["Ramen", "Pho"]).await;
        let yesterday = Utc::now() - Duration::days(1);
        for item in &items {
            store.update_item_stats(&item.id, true, yesterday).await.unwrap();
        }

        let menu = MenuGenerator::new(&store)
            .generate_menu(
                &MenuParams::new([list.id], 2),
                &mut StdRng::seed_from_u64(9),
                Deadline::none(),
            )
            .await
            .unwrap();

        assert!(menu.entries.is_empty());
        assert_eq!(menu.satisfied, 0);
        assert!(menu.is_short());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn max_items_caps_the_draw() {
        let store = MemoryStore::new();
        let mut capped = NewList::named("Capped");
        capped.max_items = Some(1);
        let (a, _) = list_with_items(&store, capped, &["One", "Two"]).await;
        let (b, _) = list_with_items(&store, NewList::named("Open"), &["Three", "Four"]).await;

        let menu = MenuGenerator::new(&store)
            .generate_menu(
                &MenuParams::new([a.id, b.id], 4),
                &mut StdRng::seed_from_u64(5),
                Deadline::none(),
            )
            .await
            .unwrap();
        assert_eq!(menu.satisfied, 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn excluded_items_are_never_drawn() {
        let store = MemoryStore::new();
        let (list, items) = list_with_items(&store, NewList::named("Films"), &["A", "B", "C"]).await;
        let params = MenuParams::new([list.id], 3).excluding([items[0].id]);

        let menu = MenuGenerator::new(&store)
            .generate_menu(&params, &mut StdRng::seed_from_u64(11), Deadline::none())
            .await
            .unwrap();
        assert_eq!(menu.satisfied, 2);
        assert!(!menu.item_ids().contains(&items[0].id));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_params_and_unknown_lists_fail() {
        let store = MemoryStore::new();
        let generator = MenuGenerator::new(&store);
        let mut rng = StdRng::seed_from_u64(0);

        assert!(matches!(
            generator
                .generate_menu(&MenuParams::new([ListId::new()], 0), &mut rng, Deadline::none())
                .await,
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            generator
                .generate_menu(&MenuParams::new([ListId::new()], 1), &mut rng, Deadline::none())
                .await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn expired_deadline_records_nothing() {
        let store = MemoryStore::new();
        let (list, items) = list_with_items(&store, NewList::named("Walks"), &["River"]).await;

        let error = MenuGenerator::new(&store)
            .generate_menu(
                &MenuParams::new([list.id], 1),
                &mut StdRng::seed_from_u64(1),
                Deadline::after(std::time::Duration::ZERO),
            )
            .await
            .unwrap_err();
        assert!(matches!(error, Error::Timeout(_)));
        let item = store.get_item(&items[0].id).await.unwrap().unwrap();
        assert_eq!(item.chosen_count, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn menu_generation_leaves_sync_state_alone() {
        let store = MemoryStore::new();
        let (list, _) = list_with_items(&store, NewList::named("Parks"), &["North"]).await;

        MenuGenerator::new(&store)
            .generate_menu(
                &MenuParams::new([list.id], 1),
                &mut StdRng::seed_from_u64(8),
                Deadline::none(),
            )
            .await
            .unwrap();
        let stored = store.get_list(&list.id).await.unwrap().unwrap();
        assert_eq!(stored.sync, list.sync);
        assert_eq!(stored.sync_version, list.sync_version);
    }
}
