use std::collections::HashMap;

/// Shown in place of a genre id the directory does not know.
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Genre id to name lookup, loaded once at bootstrap and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct GenreDirectory {
    names: HashMap<i32, String>,
}

impl GenreDirectory {
    pub fn new(names: HashMap<i32, String>) -> Self {
        Self { names }
    }

    pub fn name(&self, id: i32) -> &str {
        self.names
            .get(&id)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_GENRE)
    }

    pub fn names_for<'a>(&'a self, ids: &[i32]) -> Vec<&'a str> {
        ids.iter().map(|id| self.name(*id)).collect()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl FromIterator<(i32, String)> for GenreDirectory {
    fn from_iter<T: IntoIterator<Item = (i32, String)>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
