use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A single document reference in the explorer tree.
///
/// The presence of `children` (even when empty) marks a folder; a leaf
/// document carries `None`. Child order is meaningful: it is the display
/// order and the traversal order used for range selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocRefNode {
    pub uuid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<DocRefNode>>,
}

impl DocRefNode {
    /// Create a new folder node with no children
    pub fn new_folder(
        uuid: impl Into<String>,
        name: impl Into<String>,
        doc_type: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            doc_type: doc_type.into(),
            children: Some(Vec::new()),
        }
    }

    /// Create a new leaf document node
    pub fn new_doc(
        uuid: impl Into<String>,
        name: impl Into<String>,
        doc_type: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            doc_type: doc_type.into(),
            children: None,
        }
    }

    /// Replace the children of this node, turning it into a folder
    pub fn with_children(mut self, children: Vec<DocRefNode>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn is_folder(&self) -> bool {
        self.children.is_some()
    }

    /// Children in display order; empty for leaf documents
    pub fn children(&self) -> &[DocRefNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Append a child. Returns false when this node is not a folder.
    pub fn add_child(&mut self, child: DocRefNode) -> bool {
        match self.children.as_mut() {
            Some(children) => {
                children.push(child);
                true
            }
            None => false,
        }
    }

    /// Remove a direct child node by uuid
    pub fn remove_child(&mut self, uuid: &str) -> Option<DocRefNode> {
        let children = self.children.as_mut()?;
        let index = children.iter().position(|child| child.uuid == uuid)?;
        Some(children.remove(index))
    }
}

/// The canonical document tree shared by every explorer view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTree {
    pub root: DocRefNode,
}

impl DocumentTree {
    pub fn new(root: DocRefNode) -> Self {
        Self { root }
    }

    /// Find a node by uuid
    pub fn find_node(&self, uuid: &str) -> Option<&DocRefNode> {
        Self::find_node_recursive(&self.root, uuid)
    }

    /// Find a node by uuid (mutable)
    pub fn find_node_mut(&mut self, uuid: &str) -> Option<&mut DocRefNode> {
        Self::find_node_recursive_mut(&mut self.root, uuid)
    }

    fn find_node_recursive<'a>(node: &'a DocRefNode, uuid: &str) -> Option<&'a DocRefNode> {
        if node.uuid == uuid {
            return Some(node);
        }

        node.children()
            .iter()
            .find_map(|child| Self::find_node_recursive(child, uuid))
    }

    fn find_node_recursive_mut<'a>(
        node: &'a mut DocRefNode,
        uuid: &str,
    ) -> Option<&'a mut DocRefNode> {
        if node.uuid == uuid {
            return Some(node);
        }

        node.children
            .as_mut()?
            .iter_mut()
            .find_map(|child| Self::find_node_recursive_mut(child, uuid))
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.find_node(uuid).is_some()
    }

    /// Ancestors of a node ordered root first, excluding the node itself
    pub fn lineage_of(&self, uuid: &str) -> Option<Vec<&DocRefNode>> {
        let mut found = None;
        self.iterate_nodes(|lineage, node| {
            if found.is_none() && node.uuid == uuid {
                found = Some(lineage.to_vec());
            }
        });
        found
    }

    /// True when `uuid` is `ancestor_uuid` itself or lives somewhere below it
    pub fn is_in_subtree(&self, ancestor_uuid: &str, uuid: &str) -> bool {
        self.find_node(ancestor_uuid)
            .map(|ancestor| Self::find_node_recursive(ancestor, uuid).is_some())
            .unwrap_or(false)
    }

    /// Depth-first, pre-order walk visiting every node exactly once.
    /// The callback receives the lineage (root first) and the node.
    pub fn iterate_nodes<'a, F>(&'a self, mut callback: F)
    where
        F: FnMut(&[&'a DocRefNode], &'a DocRefNode),
    {
        let mut lineage = Vec::new();
        Self::iterate_recursive(&self.root, &mut lineage, &mut callback);
    }

    fn iterate_recursive<'a, F>(
        node: &'a DocRefNode,
        lineage: &mut Vec<&'a DocRefNode>,
        callback: &mut F,
    ) where
        F: FnMut(&[&'a DocRefNode], &'a DocRefNode),
    {
        callback(lineage, node);

        lineage.push(node);
        for child in node.children() {
            Self::iterate_recursive(child, lineage, callback);
        }
        lineage.pop();
    }

    /// Every uuid in traversal order
    pub fn uuids(&self) -> Vec<String> {
        let mut uuids = Vec::new();
        self.iterate_nodes(|_, node| uuids.push(node.uuid.clone()));
        uuids
    }

    pub fn uuid_set(&self) -> HashSet<String> {
        let mut uuids = HashSet::new();
        self.iterate_nodes(|_, node| {
            uuids.insert(node.uuid.clone());
        });
        uuids
    }

    /// First uuid that appears more than once, in traversal order
    pub fn first_duplicate_uuid(&self) -> Option<String> {
        let mut seen = HashSet::new();
        let mut duplicate = None;
        self.iterate_nodes(|_, node| {
            if duplicate.is_none() && !seen.insert(node.uuid.as_str()) {
                duplicate = Some(node.uuid.clone());
            }
        });
        duplicate
    }

    /// Detach a node (with its subtree) from wherever it sits.
    /// The root itself can never be removed.
    pub fn remove_node(&mut self, uuid: &str) -> Option<DocRefNode> {
        Self::remove_recursive(&mut self.root, uuid)
    }

    fn remove_recursive(node: &mut DocRefNode, uuid: &str) -> Option<DocRefNode> {
        if let Some(removed) = node.remove_child(uuid) {
            return Some(removed);
        }

        node.children
            .as_mut()?
            .iter_mut()
            .find_map(|child| Self::remove_recursive(child, uuid))
    }

    /// Get tree statistics
    pub fn get_stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        self.iterate_nodes(|lineage, node| {
            if node.is_folder() {
                stats.folders += 1;
            } else {
                stats.documents += 1;
            }
            stats.total_nodes += 1;
            stats.max_depth = stats.max_depth.max(lineage.len());
        });
        stats
    }
}

/// Statistics about the document tree
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeStats {
    pub total_nodes: usize,
    pub folders: usize,
    pub documents: usize,
    pub max_depth: usize,
}
