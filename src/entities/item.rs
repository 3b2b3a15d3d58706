use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

const UNKNOWN_ITEM_NAME: &str = "Unknown item";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(transparent)]
pub struct ItemClassId(pub u16);

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemClass {
    pub id: ItemClassId,
    pub name: String,
    #[serde(default)]
    pub sprite: u16,
}

#[derive(Debug)]
pub struct ItemClassDb {
    classes: HashMap<ItemClassId, ItemClass>,
    /// Handed out for ids the database does not know.
    unknown: ItemClass,
    /// Unknown ids already logged.
    reported: Mutex<BTreeSet<ItemClassId>>,
}

impl Default for ItemClassDb {
    fn default() -> Self {
        Self {
            classes: HashMap::new(),
            unknown: ItemClass {
                id: ItemClassId(0),
                name: UNKNOWN_ITEM_NAME.to_string(),
                sprite: 0,
            },
            reported: Mutex::new(BTreeSet::new()),
        }
    }
}

impl Clone for ItemClassDb {
    fn clone(&self) -> Self {
        Self {
            classes: self.classes.clone(),
            unknown: self.unknown.clone(),
            reported: Mutex::new(self.reported_ids()),
        }
    }
}

impl ItemClassDb {
    pub fn from_classes(classes: impl IntoIterator<Item = ItemClass>) -> Self {
        let mut db = Self::default();
        for class in classes {
            db.insert(class);
        }
        db
    }

    pub fn insert(&mut self, class: ItemClass) {
        if class.id.0 == 0 {
            tracing::warn!(name = %class.name, "item class id 0 is reserved, skipped");
            return;
        }
        self.classes.insert(class.id, class);
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn find(&self, id: ItemClassId) -> Option<&ItemClass> {
        self.classes.get(&id)
    }

    /// Never fails: unknown ids resolve to the "Unknown item" class, logged
    /// once per id.
    pub fn get(&self, id: ItemClassId) -> &ItemClass {
        match self.classes.get(&id) {
            Some(class) => class,
            None => {
                let first = self
                    .reported
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .insert(id);
                if first {
                    tracing::warn!(item = id.0, "unknown item class");
                }
                &self.unknown
            }
        }
    }

    fn reported_ids(&self) -> BTreeSet<ItemClassId> {
        self.reported
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn sprite(&self, id: Option<ItemClassId>) -> u16 {
        id.map(|id| self.get(id).sprite).unwrap_or(0)
    }
}
