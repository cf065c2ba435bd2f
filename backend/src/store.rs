use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use async_trait::async_trait;
use tracing::warn;

use crate::{
    error::AppError,
    models::page::{PageId, PageRef, Viewer},
};

/// Synchronous access to one space's page tree.
pub trait PageSource {
    fn page_by_title(&self, title: &str) -> Option<&PageRef>;
    fn root(&self) -> Option<&PageRef>;
    /// Children of `id` in display order.
    fn children(&self, id: PageId) -> Vec<&PageRef>;
    /// True when `candidate` lies strictly above `of` in the tree.
    fn is_ancestor(&self, candidate: PageId, of: PageId) -> bool;
}

pub trait PermissionOracle {
    fn can_view(&self, viewer: &Viewer, page: &PageRef) -> bool;
}

#[async_trait]
pub trait PageRepository: Send + Sync {
    async fn load_space(&self, space_id: i64) -> Result<Option<Arc<SpaceSnapshot>>, AppError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Space {
    pub id: i64,
    pub key: String,
    pub root_page_id: Option<PageId>,
}

/// Pages, labels and view restrictions of a single space, loaded once per
/// request and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct SpaceSnapshot {
    space: Space,
    pages: HashMap<PageId, PageRef>,
    titles: HashMap<String, PageId>,
    children: HashMap<PageId, Vec<PageId>>,
    restrictions: HashMap<PageId, HashSet<String>>,
}

impl SpaceSnapshot {
    pub fn builder(space: Space) -> SnapshotBuilder {
        SnapshotBuilder {
            space,
            pages: HashMap::new(),
            order: Vec::new(),
            restrictions: HashMap::new(),
        }
    }

    pub fn space(&self) -> &Space {
        &self.space
    }

    pub fn page(&self, id: PageId) -> Option<&PageRef> {
        self.pages.get(&id)
    }

    /// Ancestors of `id` from the direct parent up to the root.
    pub fn ancestors(&self, id: PageId) -> Vec<&PageRef> {
        let mut chain = Vec::new();
        let mut cursor = self.page(id).and_then(|page| page.parent_id);
        while let Some(parent) = cursor.and_then(|parent_id| self.page(parent_id)) {
            chain.push(parent);
            cursor = parent.parent_id;
        }
        chain
    }
}

impl PageSource for SpaceSnapshot {
    fn page_by_title(&self, title: &str) -> Option<&PageRef> {
        self.titles.get(title).and_then(|id| self.pages.get(id))
    }

    fn root(&self) -> Option<&PageRef> {
        self.space.root_page_id.and_then(|id| self.pages.get(&id))
    }

    fn children(&self, id: PageId) -> Vec<&PageRef> {
        self.children
            .get(&id)
            .map(|ids| ids.iter().filter_map(|child| self.pages.get(child)).collect())
            .unwrap_or_default()
    }

    fn is_ancestor(&self, candidate: PageId, of: PageId) -> bool {
        self.ancestors(of).iter().any(|page| page.id == candidate)
    }
}

impl PermissionOracle for SpaceSnapshot {
    /// Restrictions are inherited: every restricted page on the
    /// ancestor-or-self chain must list the viewer.
    fn can_view(&self, viewer: &Viewer, page: &PageRef) -> bool {
        std::iter::once(page)
            .chain(self.ancestors(page.id))
            .all(|link| match self.restrictions.get(&link.id) {
                Some(allowed) if !allowed.is_empty() => viewer
                    .username()
                    .is_some_and(|name| allowed.contains(name)),
                _ => true,
            })
    }
}

pub struct SnapshotBuilder {
    space: Space,
    pages: HashMap<PageId, PageRef>,
    order: Vec<PageId>,
    restrictions: HashMap<PageId, HashSet<String>>,
}

impl SnapshotBuilder {
    pub fn page(mut self, id: i64, parent: Option<i64>, title: &str, position: Option<i32>) -> Self {
        let id = PageId(id);
        if !self.pages.contains_key(&id) {
            self.order.push(id);
        }
        self.pages.insert(
            id,
            PageRef {
                id,
                parent_id: parent.map(PageId),
                title: title.to_string(),
                position,
                labels: Default::default(),
            },
        );
        self
    }

    /// Labels for pages that were never added are dropped.
    pub fn label(mut self, page: i64, label: &str) -> Self {
        if let Some(page) = self.pages.get_mut(&PageId(page)) {
            page.labels.insert(label.to_string());
        }
        self
    }

    pub fn restrict(mut self, page: i64, username: &str) -> Self {
        self.restrictions
            .entry(PageId(page))
            .or_default()
            .insert(username.to_string());
        self
    }

    pub fn build(self) -> SpaceSnapshot {
        let SnapshotBuilder {
            space,
            mut pages,
            order,
            restrictions,
        } = self;

        if let Some(root) = space.root_page_id.and_then(|id| pages.get_mut(&id)) {
            root.parent_id = None;
        }
        for page_id in detach_cycles(&mut pages) {
            warn!(space_id = space.id, page_id = page_id.0, "detached page from parent cycle");
        }

        let mut titles = HashMap::new();
        for id in &order {
            if let Some(page) = pages.get(id) {
                titles.entry(page.title.clone()).or_insert(*id);
            }
        }

        let mut children: HashMap<PageId, Vec<PageId>> = HashMap::new();
        for page in pages.values() {
            if let Some(parent) = page.parent_id.filter(|parent| pages.contains_key(parent)) {
                children.entry(parent).or_default().push(page.id);
            }
        }
        for siblings in children.values_mut() {
            siblings.sort_by(|left, right| {
                let (left, right) = (&pages[left], &pages[right]);
                display_key(left).cmp(&display_key(right))
            });
        }

        SpaceSnapshot {
            space,
            pages,
            titles,
            children,
            restrictions,
        }
    }
}

/// Explicit positions first, ascending, then title.
fn display_key(page: &PageRef) -> (bool, Option<i32>, &str, PageId) {
    (page.position.is_none(), page.position, page.title.as_str(), page.id)
}

fn detach_cycles(pages: &mut HashMap<PageId, PageRef>) -> Vec<PageId> {
    let mut detached = Vec::new();
    let mut ids: Vec<PageId> = pages.keys().copied().collect();
    ids.sort();

    for id in ids {
        let mut seen = HashSet::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if !seen.insert(current) {
                if let Some(page) = pages.get_mut(&current) {
                    page.parent_id = None;
                }
                detached.push(current);
                break;
            }
            cursor = pages.get(&current).and_then(|page| page.parent_id);
        }
    }
    detached
}

/// Serves prebuilt snapshots without a database.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    spaces: HashMap<i64, Arc<SpaceSnapshot>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_space(mut self, snapshot: SpaceSnapshot) -> Self {
        self.spaces.insert(snapshot.space().id, Arc::new(snapshot));
        self
    }
}

#[async_trait]
impl PageRepository for MemoryRepository {
    async fn load_space(&self, space_id: i64) -> Result<Option<Arc<SpaceSnapshot>>, AppError> {
        Ok(self.spaces.get(&space_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn space() -> Space {
        Space {
            id: 1,
            key: "DOC".into(),
            root_page_id: Some(PageId(1)),
        }
    }

    fn snapshot() -> SpaceSnapshot {
        SpaceSnapshot::builder(space())
            .page(1, None, "Home", None)
            .page(2, Some(1), "Zeta", Some(0))
            .page(3, Some(1), "Alpha", None)
            .page(4, Some(1), "Beta", Some(1))
            .page(5, Some(4), "Nested", None)
            .page(6, Some(5), "Deep", None)
            .restrict(4, "alice")
            .build()
    }

    fn titles(pages: Vec<&PageRef>) -> Vec<&str> {
        pages.into_iter().map(|page| page.title.as_str()).collect()
    }

    #[test]
    fn children_follow_position_then_title() {
        let snapshot = snapshot();
        assert_eq!(titles(snapshot.children(PageId(1))), ["Zeta", "Beta", "Alpha"]);
        assert!(snapshot.children(PageId(6)).is_empty());
    }

    #[test]
    fn ancestor_check_is_strict() {
        let snapshot = snapshot();
        assert!(snapshot.is_ancestor(PageId(1), PageId(6)));
        assert!(snapshot.is_ancestor(PageId(4), PageId(6)));
        assert!(!snapshot.is_ancestor(PageId(6), PageId(6)));
        assert!(!snapshot.is_ancestor(PageId(2), PageId(6)));
    }

    #[test]
    fn restrictions_are_inherited() {
        let snapshot = snapshot();
        let deep = snapshot.page(PageId(6)).unwrap();
        let alice = Viewer::User("alice".into());
        let bob = Viewer::User("bob".into());

        assert!(snapshot.can_view(&alice, deep));
        assert!(!snapshot.can_view(&bob, deep));
        assert!(!snapshot.can_view(&Viewer::Anonymous, deep));
        assert!(snapshot.can_view(&Viewer::Anonymous, snapshot.page(PageId(2)).unwrap()));
    }

    #[test]
    fn parent_cycles_are_broken() {
        let snapshot = SpaceSnapshot::builder(space())
            .page(1, Some(3), "Home", None)
            .page(3, Some(1), "Loop", None)
            .page(7, Some(8), "A", None)
            .page(8, Some(7), "B", None)
            .build();

        assert_eq!(titles(snapshot.children(PageId(1))), ["Loop"]);
        assert!(snapshot.root().unwrap().parent_id.is_none());
        let a = snapshot.ancestors(PageId(7)).len();
        let b = snapshot.ancestors(PageId(8)).len();
        assert_eq!(a + b, 1);
    }

    #[test]
    fn title_lookup_keeps_first_page() {
        let snapshot = SpaceSnapshot::builder(space())
            .page(1, None, "Home", None)
            .page(2, Some(1), "Same", None)
            .page(3, Some(1), "Same", None)
            .build();
        assert_eq!(snapshot.page_by_title("Same").unwrap().id, PageId(2));
        assert!(snapshot.page_by_title("Missing").is_none());
    }

    #[actix_web::test]
    async fn memory_repository_returns_known_spaces() {
        let repository = MemoryRepository::new().with_space(snapshot());
        assert!(repository.load_space(1).await.unwrap().is_some());
        assert!(repository.load_space(2).await.unwrap().is_none());
    }
}
