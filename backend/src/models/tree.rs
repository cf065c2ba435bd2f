use serde::{Deserialize, Serialize};

use crate::models::page::PageRef;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    #[default]
    Normal,
    Ancestor,
    Current,
}

/// Sidebar node as sent to the client.
///
/// `children` is `None` for a node without visible children, an empty list
/// for a node whose children exist but were not expanded, and the expanded
/// list along the path to the current page. An ancestor whose children are
/// all hidden is expanded to an empty list with `has_children` false.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    #[serde(rename = "type")]
    pub role: NodeRole,
    pub id: String,
    pub title: String,
    pub link: String,
    pub has_children: bool,
    pub children: Option<Vec<TreeNode>>,
}

impl TreeNode {
    pub fn new(page: &PageRef, link: String, has_children: bool) -> Self {
        Self {
            role: NodeRole::Normal,
            id: page.id.to_string(),
            title: page.title.clone(),
            link,
            has_children,
            children: has_children.then(Vec::new),
        }
    }

    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_children(mut self, children: Vec<TreeNode>) -> Self {
        self.children = Some(children);
        self
    }

    #[cfg(test)]
    pub fn is_expanded(&self) -> bool {
        self.children
            .as_ref()
            .is_some_and(|children| !children.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::page::PageId;
    use serde_json::json;

    fn page(title: &str) -> PageRef {
        PageRef {
            id: PageId(7),
            parent_id: None,
            title: title.into(),
            position: None,
            labels: Default::default(),
        }
    }

    #[test]
    fn leaf_serializes_null_children() {
        let node = TreeNode::new(&page("Intro"), "/doc/intro".into(), false);
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({
                "type": "normal",
                "id": "7",
                "title": "Intro",
                "link": "/doc/intro",
                "hasChildren": false,
                "children": null
            })
        );
    }

    #[test]
    fn collapsed_node_has_empty_children() {
        let node = TreeNode::new(&page("Guide"), "/doc/guide".into(), true)
            .with_role(NodeRole::Ancestor);
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["type"], "ancestor");
        assert_eq!(value["children"], json!([]));
        assert!(!node.is_expanded());
    }
}
