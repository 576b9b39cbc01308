use super::header::ColumnNames;
use ahash::AHashMap;
use serde::{ser::SerializeMap, Serialize, Serializer};
use std::{collections::hash_map::Entry, sync::Arc};

/// One row of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Row {
    /// Fields indexed by position, produced when no column names are active.
    Positional(Vec<String>),
    /// Fields keyed by column name, in column order.
    Named(NamedRow),
}

impl Row {
    #[inline]
    pub fn len(&self) -> usize {
        match self {
            Row::Positional(fields) => fields.len(),
            Row::Named(row) => row.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_named(&self) -> bool {
        matches!(self, Row::Named(_))
    }

    /// Field at `position`, whatever the row's shape.
    pub fn field(&self, position: usize) -> Option<&str> {
        match self {
            Row::Positional(fields) => fields.get(position).map(String::as_str),
            Row::Named(row) => row.entries.get(position).map(|(_, value)| value.as_str()),
        }
    }

    /// Field under column `name`. Always `None` for positional rows.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            Row::Positional(_) => None,
            Row::Named(row) => row.get(name),
        }
    }

    pub fn as_positional(&self) -> Option<&[String]> {
        match self {
            Row::Positional(fields) => Some(fields),
            Row::Named(_) => None,
        }
    }

    pub fn as_named(&self) -> Option<&NamedRow> {
        match self {
            Row::Positional(_) => None,
            Row::Named(row) => Some(row),
        }
    }

    /// Field values in column order, dropping any names.
    pub fn into_fields(self) -> Vec<String> {
        match self {
            Row::Positional(fields) => fields,
            Row::Named(row) => row.entries.into_iter().map(|(_, value)| value).collect(),
        }
    }
}

/// Ordered column-name to value mapping.
///
/// Keys are unique. When two columns share a name the first position is kept
/// and holds the later value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamedRow {
    pub(crate) entries: Vec<(Arc<str>, String)>,
}

impl NamedRow {
    /// Pairs `fields` with `names` by position. Fields past the last name get
    /// the `"Column k"` fallback; names past the last field are left out.
    pub(crate) fn from_fields(names: &ColumnNames, fields: Vec<String>) -> Self {
        if names.covers_uniquely(fields.len()) {
            let entries = fields
                .into_iter()
                .enumerate()
                .map(|(position, value)| (names.name_for(position), value))
                .collect();
            return Self { entries };
        }

        // Duplicate or generated names may collide; later values overwrite
        // earlier ones in place.
        let mut slots: AHashMap<Arc<str>, usize> = AHashMap::with_capacity(fields.len());
        let mut entries: Vec<(Arc<str>, String)> = Vec::with_capacity(fields.len());
        for (position, value) in fields.into_iter().enumerate() {
            let name = names.name_for(position);
            match slots.entry(Arc::clone(&name)) {
                Entry::Occupied(slot) => entries[*slot.get()].1 = value,
                Entry::Vacant(slot) => {
                    slot.insert(entries.len());
                    entries.push((name, value));
                }
            }
        }
        Self { entries }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| &**key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| &**key)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, value)| value.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, value)| (&**key, value.as_str()))
    }
}

impl Serialize for NamedRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in self.iter() {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}
