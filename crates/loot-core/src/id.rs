//! `namespace:path` identifiers

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A resource identifier of the form `namespace:path`
///
/// Both halves are non-empty and neither contains a `:`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LootId {
    namespace: String,
    path: String,
}

impl LootId {
    /// Build an identifier from its two halves
    pub fn new(namespace: impl Into<String>, path: impl Into<String>) -> Result<Self> {
        let namespace = namespace.into();
        let path = path.into();
        if namespace.is_empty() || path.is_empty() || namespace.contains(':') || path.contains(':') {
            return Err(Error::InvalidLootId(format!("{namespace}:{path}")));
        }
        Ok(Self { namespace, path })
    }

    /// Compose an id from parts taken from an already-valid id
    pub(crate) fn derived(namespace: &str, path: String) -> Self {
        Self {
            namespace: namespace.to_string(),
            path,
        }
    }

    /// Parse `namespace:path`
    pub fn parse(id: &str) -> Result<Self> {
        match id.split_once(':') {
            Some((namespace, path)) => Self::new(namespace, path),
            None => Err(Error::InvalidLootId(id.to_string())),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for LootId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}

impl FromStr for LootId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LootId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<LootId> for String {
    fn from(id: LootId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        let id = LootId::parse("minecraft:chests/simple_dungeon").unwrap();
        assert_eq!(id.namespace(), "minecraft");
        assert_eq!(id.path(), "chests/simple_dungeon");
        assert_eq!(id.to_string(), "minecraft:chests/simple_dungeon");
    }

    #[test]
    fn test_parse_rejects_bad_separators() {
        assert!(LootId::parse("no_separator").is_err());
        assert!(LootId::parse(":leading").is_err());
        assert!(LootId::parse("trailing:").is_err());
        assert!(LootId::parse("a:b:c").is_err());
        assert!(LootId::parse("").is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let id = LootId::new("loot_editor", "replacements/minecraft/chests/x").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"loot_editor:replacements/minecraft/chests/x\"");

        let back: LootId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<LootId>("\"broken\"").is_err());
    }

    #[test]
    fn test_ordering_by_namespace_then_path() {
        let a = LootId::parse("a:z").unwrap();
        let b = LootId::parse("b:a").unwrap();
        assert!(a < b);
    }
}
