//! Permission-filtered page trees for the navigation sidebar.

pub mod engine;
pub mod path_stack;
pub mod slug;
pub mod visibility;

use tracing::{debug, warn};

use crate::{
    error::AppError,
    models::{
        page::{PageRef, Viewer},
        tree::TreeNode,
    },
    store::{PageSource, PermissionOracle, SpaceSnapshot},
};

pub use engine::TreeFilterEngine;
pub use path_stack::PathStack;
pub use slug::slug;
pub use visibility::VisibilityFilter;

/// Parent titles starting with this marker stand for the space root.
pub const ROOT_MARKER: char = '/';

/// Children of `parent` with the branch leading to `current` expanded.
///
/// A blank or unknown `current` yields a flat, collapsed listing.
pub fn filtered_path(
    snapshot: &SpaceSnapshot,
    viewer: &Viewer,
    parent: &str,
    current: Option<&str>,
    exclude_label: &str,
) -> Result<Vec<TreeNode>, AppError> {
    let parent_page = if parent.starts_with(ROOT_MARKER) {
        snapshot
            .root()
            .ok_or_else(|| AppError::NotFound(format!("root page of space {}", snapshot.space().key)))?
    } else {
        resolve_page(snapshot, parent)?
    };
    ensure_viewable(snapshot, viewer, parent_page)?;

    let current_page = current
        .filter(|title| !title.trim().is_empty())
        .and_then(|title| {
            let page = snapshot.page_by_title(title);
            if page.is_none() {
                debug!(space = %snapshot.space().key, current = title, "current page not found");
            }
            page
        });

    let engine = TreeFilterEngine::new(snapshot, snapshot, viewer, exclude_label);
    let children = engine.visibility().visible_children(parent_page);
    let mut stack = link_stack(snapshot, parent_page);
    Ok(engine.build_filtered_path(&children, current_page, &mut stack))
}

/// One collapsed level below `parent`, linked under `parent_link`.
pub fn direct_children(
    snapshot: &SpaceSnapshot,
    viewer: &Viewer,
    parent: &str,
    parent_link: &str,
    exclude_label: &str,
) -> Result<Vec<TreeNode>, AppError> {
    let parent_page = resolve_page(snapshot, parent)?;
    ensure_viewable(snapshot, viewer, parent_page)?;

    let engine = TreeFilterEngine::new(snapshot, snapshot, viewer, exclude_label);
    let children = engine.visibility().visible_children(parent_page);
    Ok(engine.build_direct_children(&children, parent_link))
}

/// A single page node with its visible children attached, collapsed.
pub fn page_node(
    snapshot: &SpaceSnapshot,
    viewer: &Viewer,
    title: &str,
    exclude_label: &str,
) -> Result<TreeNode, AppError> {
    let page = resolve_page(snapshot, title)?;
    ensure_viewable(snapshot, viewer, page)?;

    let engine = TreeFilterEngine::new(snapshot, snapshot, viewer, exclude_label);
    let children = engine.visibility().visible_children(page);
    let link = link_stack(snapshot, page).current_path();
    let nodes = engine.build_direct_children(&children, &link);
    let node = TreeNode::new(page, link, !nodes.is_empty());
    Ok(if node.has_children {
        node.with_children(nodes)
    } else {
        node
    })
}

fn resolve_page<'s>(snapshot: &'s SpaceSnapshot, title: &str) -> Result<&'s PageRef, AppError> {
    snapshot
        .page_by_title(title)
        .ok_or_else(|| AppError::NotFound(format!("page {title} in space {}", snapshot.space().key)))
}

fn ensure_viewable(snapshot: &SpaceSnapshot, viewer: &Viewer, page: &PageRef) -> Result<(), AppError> {
    if snapshot.can_view(viewer, page) {
        return Ok(());
    }
    warn!(viewer = %viewer, page_id = %page.id, "view permission denied");
    Err(AppError::Forbidden(format!("page {}", page.title)))
}

/// Stack holding the space key and every page between the root and `page`.
/// The root page itself contributes no fragment.
fn link_stack(snapshot: &SpaceSnapshot, page: &PageRef) -> PathStack {
    let mut stack = PathStack::with_root(slug(&snapshot.space().key));
    let mut chain: Vec<&PageRef> = snapshot.ancestors(page.id);
    chain.reverse();
    chain.push(page);
    let root_id = snapshot.space().root_page_id;
    for link in chain.into_iter().filter(|link| Some(link.id) != root_id) {
        stack.push(slug(&link.title));
    }
    stack
}
