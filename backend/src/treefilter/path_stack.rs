use crate::treefilter::slug::slug;

/// URL fragments from the tree root down to the node being expanded.
///
/// One stack belongs to one traversal; it is created with the request and
/// dropped with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathStack {
    fragments: Vec<String>,
}

impl PathStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(fragment: impl Into<String>) -> Self {
        let mut stack = Self::new();
        stack.push(fragment);
        stack
    }

    pub fn push(&mut self, fragment: impl Into<String>) {
        self.fragments.push(fragment.into());
    }

    /// No-op on an empty stack.
    pub fn pop(&mut self) -> Option<String> {
        self.fragments.pop()
    }

    pub fn depth(&self) -> usize {
        self.fragments.len()
    }

    pub fn current_path(&self) -> String {
        self.fragments.concat()
    }

    pub fn link_for(&self, title: &str) -> String {
        let mut link = self.current_path();
        link.push_str(&slug(title));
        link
    }
}
