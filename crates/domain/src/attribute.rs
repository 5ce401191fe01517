//! Attribute list kinds (colors, materials, types).

use serde::{Deserialize, Serialize};
use std::fmt;

/// The small reference lists kept alongside inventory items.
///
/// Each kind maps to its own document in the remote store, holding a
/// flat JSON array of strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Item colors.
    Color,
    /// Item materials.
    Material,
    /// Item types (categories).
    Kind,
}

impl AttributeKind {
    /// REST path of the document holding this list.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Color => "/colors.json",
            Self::Material => "/materials.json",
            Self::Kind => "/types.json",
        }
    }

    /// Singular display name, used in error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Color => "color",
            Self::Material => "material",
            Self::Kind => "type",
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
