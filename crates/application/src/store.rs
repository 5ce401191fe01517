//! Inventory data access
//!
//! Thin callers of the gateway: item CRUD under `/objects/` and the
//! shared attribute lists. All filtering happens client-side; the
//! store exposes no server-side queries.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use homevault_domain::{
    AttributeKind, HttpMethod, InventoryItem, ItemFilter, RequestError, RequestResult,
};

use crate::gateway::RequestGateway;

/// CRUD surface over inventory items and attribute lists.
pub struct InventoryStore {
    gateway: Arc<RequestGateway>,
}

impl InventoryStore {
    /// Creates a store over the given gateway.
    #[must_use]
    pub const fn new(gateway: Arc<RequestGateway>) -> Self {
        Self { gateway }
    }

    fn item_path(name: &str) -> String {
        format!("/objects/{name}.json")
    }

    /// Writes the item under its name.
    ///
    /// # Errors
    /// [`RequestError::InvalidItem`] before any network call when the
    /// name is empty; otherwise gateway errors.
    pub async fn create_item(&self, item: &InventoryItem) -> RequestResult<()> {
        if !item.is_valid() {
            return Err(RequestError::InvalidItem("name is required".to_string()));
        }
        let body = serde_json::to_value(item)
            .map_err(|e| RequestError::InvalidItem(e.to_string()))?;
        self.gateway
            .execute(HttpMethod::Put, &Self::item_path(&item.name), Some(&body))
            .await?;
        debug!(name = %item.name, "item created");
        Ok(())
    }

    /// Fetches every item. A missing document yields an empty list.
    ///
    /// # Errors
    /// Gateway errors, or [`RequestError::MalformedResponse`] when the
    /// document is not the expected name-keyed object map.
    pub async fn all_items(&self) -> RequestResult<Vec<InventoryItem>> {
        let value = self
            .gateway
            .execute(HttpMethod::Get, "/objects.json", None)
            .await?;
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Object(map) => map
                .into_values()
                .map(|entry| {
                    serde_json::from_value(entry)
                        .map_err(|e| RequestError::MalformedResponse(e.to_string()))
                })
                .collect(),
            _ => Err(RequestError::MalformedResponse(
                "expected an object map of items".to_string(),
            )),
        }
    }

    /// Items at one location/sublocation pair.
    ///
    /// # Errors
    /// Same as [`Self::all_items`].
    pub async fn items_at(
        &self,
        location_id: i32,
        sublocation_id: i32,
    ) -> RequestResult<Vec<InventoryItem>> {
        let mut items = self.all_items().await?;
        items.retain(|item| {
            item.location_id == location_id && item.sublocation_id == sublocation_id
        });
        Ok(items)
    }

    /// Replaces an item. A rename deletes the old document first,
    /// since the name is the document key.
    ///
    /// # Errors
    /// Gateway errors from either step; the delete failing aborts the
    /// create.
    pub async fn update_item(&self, old_name: &str, item: &InventoryItem) -> RequestResult<()> {
        if old_name != item.name {
            self.delete_item(old_name).await?;
        }
        self.create_item(item).await
    }

    /// Removes the item's document.
    ///
    /// # Errors
    /// Gateway errors.
    pub async fn delete_item(&self, name: &str) -> RequestResult<()> {
        self.gateway
            .execute(HttpMethod::Delete, &Self::item_path(name), None)
            .await?;
        debug!(%name, "item deleted");
        Ok(())
    }

    /// Fetches everything and filters client-side.
    ///
    /// # Errors
    /// Same as [`Self::all_items`].
    pub async fn search(&self, filter: &ItemFilter) -> RequestResult<Vec<InventoryItem>> {
        let mut items = self.all_items().await?;
        items.retain(|item| filter.matches(item));
        Ok(items)
    }

    /// The attribute list of the given kind. A missing document is an
    /// empty list; non-string entries are skipped.
    ///
    /// # Errors
    /// Gateway errors, or [`RequestError::MalformedResponse`] when the
    /// document is not an array.
    pub async fn attributes(&self, kind: AttributeKind) -> RequestResult<Vec<String>> {
        let value = self.gateway.execute(HttpMethod::Get, kind.path(), None).await?;
        match value {
            Value::Null => Ok(Vec::new()),
            Value::Array(entries) => Ok(entries
                .into_iter()
                .filter_map(|entry| entry.as_str().map(ToString::to_string))
                .collect()),
            _ => Err(RequestError::MalformedResponse(format!(
                "expected an array of {kind}s"
            ))),
        }
    }

    /// Appends a value to the attribute list.
    ///
    /// # Errors
    /// [`RequestError::AlreadyExists`] without issuing a write when the
    /// value is already present; otherwise gateway errors.
    pub async fn add_attribute(&self, kind: AttributeKind, value: &str) -> RequestResult<()> {
        let mut list = self.attributes(kind).await?;
        if list.iter().any(|existing| existing == value) {
            return Err(RequestError::AlreadyExists(format!("{kind} {value:?}")));
        }
        list.push(value.to_string());
        self.put_attributes(kind, &list).await
    }

    /// Drops every occurrence of a value from the attribute list.
    /// Removing an absent value still rewrites the list, as a no-op
    /// overwrite.
    ///
    /// # Errors
    /// Gateway errors.
    pub async fn remove_attribute(&self, kind: AttributeKind, value: &str) -> RequestResult<()> {
        let mut list = self.attributes(kind).await?;
        list.retain(|existing| existing != value);
        self.put_attributes(kind, &list).await
    }

    async fn put_attributes(&self, kind: AttributeKind, list: &[String]) -> RequestResult<()> {
        let body = serde_json::json!(list);
        self.gateway
            .execute(HttpMethod::Put, kind.path(), Some(&body))
            .await?;
        Ok(())
    }
}
