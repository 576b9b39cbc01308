//! Column names shared by every row of a traversal.
//!
//! Names are resolved once (blank cells replaced by their positional
//! fallback) and held as `Arc<str>`, so building a named row clones a
//! pointer per field instead of a string.
use ahash::AHashSet;
use std::sync::Arc;

/// Name used for a column whose header cell is blank or missing.
#[inline]
pub fn fallback_name(position: usize) -> String {
    format!("Column {}", position + 1)
}

/// An ordered, resolved set of column names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnNames {
    names: Vec<Arc<str>>,
    unique: bool,
}

impl ColumnNames {
    /// Resolves raw header cells, substituting `"Column k"` for blank ones.
    pub fn resolve<S: AsRef<str>>(raw: &[S]) -> Self {
        let names: Vec<Arc<str>> = raw
            .iter()
            .enumerate()
            .map(|(position, name)| match name.as_ref() {
                "" => Arc::from(fallback_name(position)),
                name => Arc::from(name),
            })
            .collect();

        let unique = {
            let mut seen = AHashSet::with_capacity(names.len());
            names.iter().all(|name| seen.insert(&**name))
        };

        Self { names, unique }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Name of the column at `position`, falling back past the end of the list.
    pub fn name_for(&self, position: usize) -> Arc<str> {
        match self.names.get(position) {
            Some(name) => Arc::clone(name),
            None => Arc::from(fallback_name(position)),
        }
    }

    /// True when a row of `width` fields gets a distinct name for every field
    /// without computing fallbacks.
    #[inline]
    pub(crate) fn covers_uniquely(&self, width: usize) -> bool {
        self.unique && width <= self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|name| &**name)
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(String::from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_cells_get_positional_names() {
        let names = ColumnNames::resolve(&["First name", "Surname", "", "", "DoB"]);
        assert_eq!(
            names.to_vec(),
            vec!["First name", "Surname", "Column 3", "Column 4", "DoB"]
        );
        assert!(names.covers_uniquely(5));
    }

    #[test]
    fn positions_past_the_end_fall_back() {
        let names = ColumnNames::resolve(&["a", "b"]);
        assert_eq!(&*names.name_for(1), "b");
        assert_eq!(&*names.name_for(2), "Column 3");
        assert!(!names.covers_uniquely(3));
    }

    #[test]
    fn whitespace_is_a_name() {
        let names = ColumnNames::resolve(&[" "]);
        assert_eq!(&*names.name_for(0), " ");
    }

    #[test]
    fn duplicates_are_detected() {
        let names = ColumnNames::resolve(&["id", "id"]);
        assert!(!names.covers_uniquely(2));

        // A literal header can collide with a generated one.
        let names = ColumnNames::resolve(&["Column 2", ""]);
        assert!(!names.covers_uniquely(2));
    }

    #[test]
    fn empty_list_is_empty() {
        let names = ColumnNames::resolve::<&str>(&[]);
        assert!(names.is_empty());
        assert_eq!(&*names.name_for(0), "Column 1");
    }
}
