use std::collections::BTreeSet;

use geofill_runtime::{FieldName, Profile};
use serde::{Deserialize, Serialize};

/// Fields the user has pinned against regeneration.
///
/// Serialized as a plain array of camelCase field names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LockSet {
    fields: BTreeSet<FieldName>,
}

impl LockSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, field: FieldName) -> bool {
        self.fields.contains(&field)
    }

    /// Returns `true` if the field was not locked before.
    pub fn lock(&mut self, field: FieldName) -> bool {
        self.fields.insert(field)
    }

    /// Returns `true` if the field was locked before.
    pub fn unlock(&mut self, field: FieldName) -> bool {
        self.fields.remove(&field)
    }

    /// Flip the lock and return the new state.
    pub fn toggle(&mut self, field: FieldName) -> bool {
        if self.unlock(field) {
            false
        } else {
            self.lock(field)
        }
    }

    pub fn clear(&mut self) {
        self.fields.clear();
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = FieldName> + '_ {
        self.fields.iter().copied()
    }

    /// Capture the current value of every locked field.
    pub fn snapshot(&self, profile: &Profile) -> LockedValues {
        LockedValues {
            values: self
                .fields
                .iter()
                .map(|field| (*field, profile.value(*field).map(str::to_string)))
                .collect(),
        }
    }
}

impl FromIterator<FieldName> for LockSet {
    fn from_iter<T: IntoIterator<Item = FieldName>>(iter: T) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Values of locked fields taken before a bulk mutation.
///
/// `None` records a locked field that had no value; restoring it is a no-op.
/// An empty string is a value and is restored like any other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockedValues {
    values: Vec<(FieldName, Option<String>)>,
}

impl LockedValues {
    pub fn restore(&self, profile: &mut Profile) {
        for (field, value) in &self.values {
            if let Some(value) = value {
                profile.set(*field, value.clone());
            }
        }
    }

    pub fn get(&self, field: FieldName) -> Option<&str> {
        self.values
            .iter()
            .find(|(locked, _)| *locked == field)
            .and_then(|(_, value)| value.as_deref())
    }
}
