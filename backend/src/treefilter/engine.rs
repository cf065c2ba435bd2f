use tracing::trace;

use crate::{
    models::{
        page::{PageRef, Viewer},
        tree::{NodeRole, TreeNode},
    },
    store::{PageSource, PermissionOracle},
    treefilter::{path_stack::PathStack, slug::slug, visibility::VisibilityFilter},
};

/// Builds sidebar trees for one request.
///
/// The engine only borrows the page source and the viewer; all state that
/// changes during a traversal lives in the [`PathStack`] handed to each call.
pub struct TreeFilterEngine<'a, S: ?Sized, P: ?Sized> {
    source: &'a S,
    visibility: VisibilityFilter<'a, S, P>,
}

impl<'a, S, P> TreeFilterEngine<'a, S, P>
where
    S: PageSource + ?Sized,
    P: PermissionOracle + ?Sized,
{
    pub fn new(source: &'a S, oracle: &'a P, viewer: &'a Viewer, exclude_label: &'a str) -> Self {
        Self {
            source,
            visibility: VisibilityFilter::new(source, oracle, viewer, exclude_label),
        }
    }

    pub fn visibility(&self) -> &VisibilityFilter<'a, S, P> {
        &self.visibility
    }

    /// Lists `children` and expands the branch leading to `current`.
    ///
    /// Ancestors of `current` become [`NodeRole::Ancestor`] and are always
    /// expanded, to an empty list when all their children are hidden;
    /// `current` itself becomes [`NodeRole::Current`] and is expanded one level
    /// when it has visible children. Every other node is left collapsed.
    /// Output order follows `children`. The stack is returned to its initial
    /// depth before this returns.
    pub fn build_filtered_path(
        &self,
        children: &[&'a PageRef],
        current: Option<&PageRef>,
        stack: &mut PathStack,
    ) -> Vec<TreeNode> {
        children
            .iter()
            .map(|&child| self.filtered_node(child, current, stack))
            .collect()
    }

    /// One collapsed level of nodes linked below `parent_link`.
    pub fn build_direct_children(&self, children: &[&'a PageRef], parent_link: &str) -> Vec<TreeNode> {
        children
            .iter()
            .map(|child| {
                TreeNode::new(
                    child,
                    format!("{parent_link}{}", slug(&child.title)),
                    self.visibility.has_visible_children(child),
                )
            })
            .collect()
    }

    fn filtered_node(&self, child: &'a PageRef, current: Option<&PageRef>, stack: &mut PathStack) -> TreeNode {
        let grandchildren = self.visibility.visible_children(child);
        let node = TreeNode::new(child, stack.link_for(&child.title), !grandchildren.is_empty());

        let Some(current) = current else {
            return node;
        };
        let is_current = child.id == current.id;
        let is_ancestor = self.source.is_ancestor(child.id, current.id);

        let node = if is_ancestor || (is_current && !grandchildren.is_empty()) {
            trace!(depth = stack.depth(), page_id = %child.id, "expanding path node");
            stack.push(slug(&child.title));
            let expanded = self.build_filtered_path(&grandchildren, Some(current), stack);
            stack.pop();
            node.with_children(expanded)
        } else {
            node
        };

        // current wins if a corrupt chain lists the page as its own ancestor
        if is_current {
            node.with_role(NodeRole::Current)
        } else if is_ancestor {
            node.with_role(NodeRole::Ancestor)
        } else {
            node
        }
    }
}
