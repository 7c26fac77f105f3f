/// The user's local accessory catalog: human-chosen names mapped to option
/// identifiers, per category.
///
/// This is user-curated bookkeeping, completely independent of the remote
/// service's own catalog. It is stored as a JSON record shaped
/// `{category: {name: identifier}}` and round-trips exactly, including
/// entry order.
use std::fs;
use std::path::Path;

use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

use crate::error::EditorError;
use crate::state::avatar::Category;

/// One named accessory in a category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessory {
    pub name: String,
    pub identifier: String,
}

/// Name → identifier entries for all five categories, in insertion order.
///
/// Names are unique within a category; identifiers are opaque and may be
/// registered under any number of names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AccessoryRegistry {
    // One entry list per category, indexed in Category::ALL order. The lists
    // are tiny (hand-entered), so linear lookup by name is fine.
    entries: [Vec<Accessory>; 5],
}

impl AccessoryRegistry {
    pub fn new() -> AccessoryRegistry {
        AccessoryRegistry::default()
    }

    fn slot(&self, category: Category) -> &Vec<Accessory> {
        &self.entries[category as usize]
    }

    fn slot_mut(&mut self, category: Category) -> &mut Vec<Accessory> {
        &mut self.entries[category as usize]
    }

    /// Register `name` → `identifier` in `category`.
    ///
    /// An existing name is silently overwritten in place, keeping its
    /// position. An empty name is rejected; the identifier is opaque and
    /// not validated against the remote catalog.
    pub fn add(
        &mut self,
        category: Category,
        name: impl Into<String>,
        identifier: impl Into<String>,
    ) -> Result<(), EditorError> {
        let name = name.into();
        if name.is_empty() {
            return Err(EditorError::Validation(
                "Accessory name cannot be empty".to_string(),
            ));
        }

        let identifier = identifier.into();
        let slot = self.slot_mut(category);
        match slot.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.identifier = identifier,
            None => slot.push(Accessory { name, identifier }),
        }
        Ok(())
    }

    /// Remove `name` from `category`. Removing an absent name is a no-op.
    pub fn remove(&mut self, category: Category, name: &str) {
        self.slot_mut(category).retain(|a| a.name != name);
    }

    /// The category's entries in the order they were added.
    pub fn list(&self, category: Category) -> &[Accessory] {
        self.slot(category)
    }

    /// True when no category has any entries.
    pub fn is_empty(&self) -> bool {
        self.entries.iter().all(|slot| slot.is_empty())
    }

    /// Load the registry record, tolerating its absence or corruption.
    ///
    /// A missing file is a fresh start; an unreadable or unparseable file
    /// gets a warning and a fresh start. Never fatal.
    pub fn load(path: &Path) -> AccessoryRegistry {
        if !path.exists() {
            return AccessoryRegistry::new();
        }

        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                eprintln!(
                    "⚠️  Could not read accessory record {}: {}. Starting empty.",
                    path.display(),
                    e
                );
                return AccessoryRegistry::new();
            }
        };

        match serde_json::from_str(&text) {
            Ok(registry) => registry,
            Err(e) => {
                eprintln!(
                    "⚠️  Accessory record {} is corrupted: {}. Starting empty.",
                    path.display(),
                    e
                );
                AccessoryRegistry::new()
            }
        }
    }

    /// Write the registry record, or delete it when there is nothing to keep.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if self.is_empty() {
            if path.exists() {
                fs::remove_file(path)?;
            }
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let text = serde_json::to_string_pretty(self).expect("registry serialization is total");
        fs::write(path, text)
    }
}

// The on-disk shape is a plain nested JSON object, so the serde impls are
// hand-written to keep Vec-backed insertion order instead of a sorted map.

impl Serialize for AccessoryRegistry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Category::ALL.len()))?;
        for category in Category::ALL {
            let inner: Vec<(&str, &str)> = self
                .list(category)
                .iter()
                .map(|a| (a.name.as_str(), a.identifier.as_str()))
                .collect();
            map.serialize_entry(category.label(), &OrderedEntries(inner))?;
        }
        map.end()
    }
}

struct OrderedEntries<'a>(Vec<(&'a str, &'a str)>);

impl Serialize for OrderedEntries<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, identifier) in &self.0 {
            map.serialize_entry(name, identifier)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AccessoryRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RegistryVisitor;

        impl<'de> Visitor<'de> for RegistryVisitor {
            type Value = AccessoryRegistry;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of category to {name: identifier}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut registry = AccessoryRegistry::new();
                while let Some(key) = access.next_key::<String>()? {
                    let category = Category::from_key(&key)
                        .ok_or_else(|| de::Error::custom(format!("unknown category {:?}", key)))?;
                    let entries = access.next_value_seed(EntriesSeed)?;
                    *registry.slot_mut(category) = entries;
                }
                Ok(registry)
            }
        }

        deserializer.deserialize_map(RegistryVisitor)
    }
}

struct EntriesSeed;

impl<'de> de::DeserializeSeed<'de> for EntriesSeed {
    type Value = Vec<Accessory>;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Self::Value, D::Error> {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = Vec<Accessory>;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of name to identifier")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::new();
                while let Some((name, identifier)) = access.next_entry::<String, String>()? {
                    entries.push(Accessory { name, identifier });
                }
                Ok(entries)
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_two_names_may_share_an_identifier() {
        let mut registry = AccessoryRegistry::new();
        registry.add(Category::Hats, "party", "101").unwrap();
        registry.add(Category::Hats, "birthday", "101").unwrap();

        let entries = registry.list(Category::Hats);
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|a| a.identifier == "101"));
    }

    #[test]
    fn test_add_rejects_empty_name() {
        let mut registry = AccessoryRegistry::new();
        let err = registry.add(Category::Tops, "", "5").unwrap_err();
        assert!(matches!(err, EditorError::Validation(_)));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_add_overwrites_in_place() {
        let mut registry = AccessoryRegistry::new();
        registry.add(Category::Tops, "plain", "1").unwrap();
        registry.add(Category::Tops, "fancy", "2").unwrap();
        registry.add(Category::Tops, "plain", "3").unwrap();

        let entries = registry.list(Category::Tops);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "plain");
        assert_eq!(entries[0].identifier, "3");
        assert_eq!(entries[1].name, "fancy");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let mut registry = AccessoryRegistry::new();
        registry.add(Category::Outfits, "summer", "42").unwrap();

        registry.remove(Category::Outfits, "summer");
        registry.remove(Category::Outfits, "summer");
        registry.remove(Category::Outfits, "never-existed");

        assert!(registry.is_empty());
    }

    #[test]
    fn test_round_trip_preserves_order() {
        let mut registry = AccessoryRegistry::new();
        registry.add(Category::Hats, "zebra", "9").unwrap();
        registry.add(Category::Hats, "aardvark", "1").unwrap();
        registry.add(Category::Outerwear, "coat", "7").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saves.json");

        registry.save(&path).unwrap();
        let loaded = AccessoryRegistry::load(&path);

        assert_eq!(loaded, registry);
        // insertion order, not alphabetical
        assert_eq!(loaded.list(Category::Hats)[0].name, "zebra");
        assert_eq!(loaded.list(Category::Hats)[1].name, "aardvark");
    }

    #[test]
    fn test_empty_registry_removes_record() {
        let mut registry = AccessoryRegistry::new();
        registry.add(Category::Bottoms, "jeans", "12").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saves.json");

        registry.save(&path).unwrap();
        assert!(path.exists());

        registry.remove(Category::Bottoms, "jeans");
        registry.save(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_corrupted_record_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saves.json");
        fs::write(&path, "{not json at all").unwrap();

        let registry = AccessoryRegistry::load(&path);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_missing_record_loads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let registry = AccessoryRegistry::load(&dir.path().join("nope.json"));
        assert!(registry.is_empty());
    }
}
