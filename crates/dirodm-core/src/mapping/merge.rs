//! Merging new attribute values into an entry while recording the changes.

use dirodm_proto::{DirectoryEntry, Modification, RawValue, OBJECT_CLASS};

/// Applies desired attribute values to an entry and records the minimal
/// modifications that take the stored state to the desired one.
pub struct EntryMerger<'e> {
    entry: &'e mut DirectoryEntry,
    modifications: Vec<Modification>,
}

impl<'e> EntryMerger<'e> {
    pub fn new(entry: &'e mut DirectoryEntry) -> Self {
        Self {
            entry,
            modifications: Vec::new(),
        }
    }

    /// Add missing object classes. Extra classes already on the entry stay.
    pub fn merge_object_classes(&mut self, classes: &[String]) {
        let missing: Vec<RawValue> = classes
            .iter()
            .filter(|class| !self.entry.has_object_class(class))
            .map(|class| RawValue::Text(class.clone()))
            .collect();
        if missing.is_empty() {
            return;
        }
        for class in &missing {
            self.entry.add_value(OBJECT_CLASS, class.clone());
        }
        self.modifications.push(Modification::Add {
            attribute: OBJECT_CLASS.to_string(),
            values: missing,
        });
    }

    /// Make `values` the complete value set of `attribute`.
    ///
    /// Stored and desired values are compared through `key`, so a stored value
    /// in another wire form of the same value is left alone. Removals name the
    /// stored value. An empty set removes the attribute.
    pub fn merge<K, F>(&mut self, attribute: &str, values: Vec<RawValue>, key: F)
    where
        K: PartialEq,
        F: Fn(&RawValue) -> K,
    {
        let stored: Vec<(K, RawValue)> = self
            .entry
            .values(attribute)
            .iter()
            .map(|v| (key(v), v.clone()))
            .collect();

        if values.is_empty() {
            if !stored.is_empty() {
                self.entry.clear(attribute);
                self.modifications.push(Modification::Clear {
                    attribute: attribute.to_string(),
                });
            }
            return;
        }

        let desired: Vec<(K, RawValue)> = values.into_iter().map(|v| (key(&v), v)).collect();
        let removed: Vec<RawValue> = stored
            .iter()
            .filter(|(k, _)| !desired.iter().any(|(d, _)| d == k))
            .map(|(_, v)| v.clone())
            .collect();
        let mut added: Vec<(K, RawValue)> = Vec::new();
        for (k, value) in desired {
            let known = stored.iter().chain(added.iter()).any(|(s, _)| *s == k);
            if !known {
                added.push((k, value));
            }
        }

        if !removed.is_empty() {
            for value in &removed {
                self.entry.remove_value(attribute, value);
            }
            self.modifications.push(Modification::Remove {
                attribute: attribute.to_string(),
                values: removed,
            });
        }
        if !added.is_empty() {
            let added: Vec<RawValue> = added.into_iter().map(|(_, v)| v).collect();
            for value in &added {
                self.entry.add_value(attribute, value.clone());
            }
            self.modifications.push(Modification::Add {
                attribute: attribute.to_string(),
                values: added,
            });
        }
    }

    /// The recorded modifications, in the order they were made.
    pub fn finish(self) -> Vec<Modification> {
        self.modifications
    }
}
