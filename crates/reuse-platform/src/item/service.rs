//! Item Catalog
//!
//! Posting, lookup, filtered listing, claim transition, partial update and
//! idempotent deletion of items.

use std::sync::Arc;

use tracing::info;

use crate::item::entity::{Item, ItemFilter, ItemPatch, NewItem};
use crate::item::repository::ItemRepository;
use crate::shared::api_common::Page;
use crate::shared::db;
use crate::shared::error::{PlatformError, Result};

pub struct ItemService {
    items: Arc<ItemRepository>,
}

impl ItemService {
    pub fn new(items: Arc<ItemRepository>) -> Self {
        Self { items }
    }

    pub async fn post_item(&self, new_item: NewItem) -> Result<Item> {
        let new_item = new_item.validated()?;
        let item = self.items.insert(&new_item, db::now()).await?;

        info!(item_id = item.id, owner = %item.owner_email, "Item posted");
        Ok(item)
    }

    pub async fn get_item(&self, id: i64) -> Result<Item> {
        self.items
            .find_by_id(id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Item", id))
    }

    pub async fn list_items(&self, filter: &ItemFilter, page: Page) -> Result<Vec<Item>> {
        self.items.list(filter, page).await
    }

    /// Mark claimed. Claiming an already claimed item succeeds.
    pub async fn claim(&self, id: i64) -> Result<Item> {
        if !self.items.mark_claimed(id).await? {
            return Err(PlatformError::not_found("Item", id));
        }
        info!(item_id = id, "Item claimed");
        self.get_item(id).await
    }

    pub async fn update(&self, id: i64, patch: ItemPatch) -> Result<Item> {
        let mut item = self.get_item(id).await?;
        patch.apply(&mut item)?;

        if !self.items.update(&item).await? {
            return Err(PlatformError::not_found("Item", id));
        }
        Ok(item)
    }

    /// Idempotent: `Ok(false)` when nothing was there.
    pub async fn delete(&self, id: i64) -> Result<bool> {
        let deleted = self.items.delete(id).await?;
        if deleted {
            info!(item_id = id, "Item deleted");
        }
        Ok(deleted)
    }
}
