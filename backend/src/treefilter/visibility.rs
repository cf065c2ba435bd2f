use crate::{
    models::page::{PageRef, Viewer},
    store::{PageSource, PermissionOracle},
};

/// Decides which children show up in the sidebar for one viewer.
///
/// A child is visible when the viewer may see it and it does not carry the
/// exclusion label. An empty label excludes nothing.
pub struct VisibilityFilter<'a, S: ?Sized, P: ?Sized> {
    source: &'a S,
    oracle: &'a P,
    viewer: &'a Viewer,
    exclude_label: &'a str,
}

impl<'a, S, P> VisibilityFilter<'a, S, P>
where
    S: PageSource + ?Sized,
    P: PermissionOracle + ?Sized,
{
    pub fn new(source: &'a S, oracle: &'a P, viewer: &'a Viewer, exclude_label: &'a str) -> Self {
        Self {
            source,
            oracle,
            viewer,
            exclude_label,
        }
    }

    pub fn is_visible(&self, candidate: &PageRef) -> bool {
        self.oracle.can_view(self.viewer, candidate) && !self.is_excluded(candidate)
    }

    pub fn visible_children(&self, parent: &PageRef) -> Vec<&'a PageRef> {
        self.source
            .children(parent.id)
            .into_iter()
            .filter(|child| self.is_visible(child))
            .collect()
    }

    pub fn has_visible_children(&self, parent: &PageRef) -> bool {
        self.source
            .children(parent.id)
            .into_iter()
            .any(|child| self.is_visible(child))
    }

    fn is_excluded(&self, candidate: &PageRef) -> bool {
        !self.exclude_label.is_empty() && candidate.has_label(self.exclude_label)
    }
}
