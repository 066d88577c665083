//! User-defined labels and the one currently used for new annotations.

/// Ordered set of unique labels.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LabelRegistry {
    labels: Vec<String>,
    selected: Option<String>,
}

impl LabelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut registry = Self::new();
        for label in labels {
            registry.add(label.as_ref());
        }
        registry
    }

    /// Add a label after trimming whitespace. Empty names and exact
    /// (case-sensitive) duplicates are ignored; returns whether it was added.
    pub fn add(&mut self, name: &str) -> bool {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return false;
        }
        self.labels.push(name.to_owned());
        true
    }

    /// Remove a label, clearing the selection if it was the selected one.
    pub fn remove(&mut self, name: &str) -> bool {
        let Some(idx) = self.labels.iter().position(|l| l == name) else {
            return false;
        };
        self.labels.remove(idx);
        if self.selected.as_deref() == Some(name) {
            self.selected = None;
        }
        true
    }

    /// Make `name` the active label. Unknown names are rejected.
    pub fn select(&mut self, name: &str) -> bool {
        if self.contains(name) {
            self.selected = Some(name.to_owned());
            true
        } else {
            false
        }
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
