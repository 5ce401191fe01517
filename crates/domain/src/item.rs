//! Inventory items and search filters.

use serde::{Deserialize, Serialize};

/// A single inventory item, keyed in the remote store by its name.
///
/// The serde shape matches the store's JSON documents: camelCase ids,
/// the category under the `type` key, and the picture as a base64
/// string that is omitted entirely when absent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    /// Item name; doubles as the document key.
    #[serde(default)]
    pub name: String,
    /// Color, drawn from the shared color list.
    #[serde(default)]
    pub color: String,
    /// Material, drawn from the shared material list.
    #[serde(default)]
    pub material: String,
    /// Category, drawn from the shared type list.
    #[serde(default, rename = "type")]
    pub kind: String,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// Optional photo, base64 on the wire.
    #[serde(
        default,
        with = "picture_b64",
        skip_serializing_if = "Option::is_none"
    )]
    pub picture: Option<Vec<u8>>,
    /// Location the item lives in.
    #[serde(default)]
    pub location_id: i32,
    /// Sublocation within the location.
    #[serde(default)]
    pub sublocation_id: i32,
}

impl InventoryItem {
    /// Creates an item with the fields that are always required.
    #[must_use]
    pub fn new(name: impl Into<String>, location_id: i32, sublocation_id: i32) -> Self {
        Self {
            name: name.into(),
            location_id,
            sublocation_id,
            ..Self::default()
        }
    }

    /// An item must at least carry a non-empty name to be stored.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Client-side search filter over the full item list.
///
/// Empty fields impose no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    /// Case-insensitive partial match on the name.
    pub name: Option<String>,
    /// Exact match against any of these colors.
    pub colors: Vec<String>,
    /// Exact match against any of these materials.
    pub materials: Vec<String>,
    /// Exact match against any of these types.
    pub kinds: Vec<String>,
}

impl ItemFilter {
    /// Whether the given item satisfies every populated constraint.
    #[must_use]
    pub fn matches(&self, item: &InventoryItem) -> bool {
        if let Some(needle) = self.name.as_deref()
            && !needle.is_empty()
            && !item.name.to_lowercase().contains(&needle.to_lowercase())
        {
            return false;
        }
        if !self.colors.is_empty() && !self.colors.contains(&item.color) {
            return false;
        }
        if !self.materials.is_empty() && !self.materials.contains(&item.material) {
            return false;
        }
        if !self.kinds.is_empty() && !self.kinds.contains(&item.kind) {
            return false;
        }
        true
    }
}

mod picture_b64 {
    //! Base64 (de)serialization for the optional picture field.

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        bytes: &Option<Vec<u8>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match bytes {
            Some(data) => serializer.serialize_str(&STANDARD.encode(data)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Vec<u8>>, D::Error> {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            Some(text) => STANDARD
                .decode(text)
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
