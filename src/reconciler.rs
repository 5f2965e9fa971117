//! Structural edits to the canonical tree.
//!
//! Every operation takes the current tree and returns a new one, or an error
//! with the input left untouched. Re-deriving view state from the new tree is
//! the engine's job.

use crate::error::{ExplorerError, Result};
use crate::ids::IdGenerator;
use crate::tree::{DocRefNode, DocumentTree};
use std::collections::HashSet;

/// Append `new_node` (and its subtree) under a folder
pub fn create(tree: &DocumentTree, parent_uuid: &str, new_node: DocRefNode) -> Result<DocumentTree> {
    let parent = tree
        .find_node(parent_uuid)
        .ok_or_else(|| ExplorerError::NotFound(parent_uuid.to_string()))?;
    if !parent.is_folder() {
        return Err(ExplorerError::NotAFolder(parent_uuid.to_string()));
    }

    ensure_fresh_uuids(&tree.uuid_set(), std::slice::from_ref(&new_node))?;

    let mut next = tree.clone();
    if let Some(parent) = next.find_node_mut(parent_uuid) {
        parent.add_child(new_node);
    }
    Ok(next)
}

/// Replace a node's name, keeping uuid, type and children
pub fn rename(tree: &DocumentTree, uuid: &str, new_name: &str) -> Result<DocumentTree> {
    let mut next = tree.clone();
    let node = next
        .find_node_mut(uuid)
        .ok_or_else(|| ExplorerError::NotFound(uuid.to_string()))?;
    node.name = new_name.to_string();
    Ok(next)
}

/// Remove each node and its subtree. Unknown uuids are skipped.
pub fn delete(tree: &DocumentTree, uuids: &[String]) -> DocumentTree {
    let mut next = tree.clone();
    for uuid in uuids {
        if next.remove_node(uuid).is_none() {
            log::debug!("Delete: {} not present, skipping", uuid);
        }
    }
    next
}

/// Check that moving `uuids` under `destination_uuid` is legal
pub fn check_move(tree: &DocumentTree, uuids: &[String], destination_uuid: &str) -> Result<()> {
    let destination = tree
        .find_node(destination_uuid)
        .ok_or_else(|| ExplorerError::NotFound(destination_uuid.to_string()))?;
    if !destination.is_folder() {
        return Err(ExplorerError::NotAFolder(destination_uuid.to_string()));
    }

    if let Some(moved) = uuids
        .iter()
        .find(|uuid| tree.is_in_subtree(uuid, destination_uuid))
    {
        return Err(ExplorerError::CyclicMove {
            moved: moved.clone(),
            destination: destination_uuid.to_string(),
        });
    }

    Ok(())
}

/// Drag-and-drop predicate: would this move succeed?
pub fn can_move(tree: &DocumentTree, uuids: &[String], destination_uuid: &str) -> bool {
    check_move(tree, uuids, destination_uuid).is_ok()
}

/// Relocate nodes (uuids and subtrees intact) to the end of a folder
pub fn move_nodes(tree: &DocumentTree, uuids: &[String], destination_uuid: &str) -> Result<DocumentTree> {
    check_move(tree, uuids, destination_uuid)?;

    let mut next = tree.clone();
    let mut moved = Vec::new();
    for uuid in outermost(tree, uuids) {
        if let Some(node) = next.remove_node(&uuid) {
            moved.push(node);
        }
    }

    let destination = next
        .find_node_mut(destination_uuid)
        .ok_or_else(|| ExplorerError::NotFound(destination_uuid.to_string()))?;
    for node in moved {
        destination.add_child(node);
    }

    Ok(next)
}

/// Deep-copy nodes under a folder, giving every cloned node a fresh uuid
pub fn copy_nodes(
    tree: &DocumentTree,
    uuids: &[String],
    destination_uuid: &str,
    ids: &dyn IdGenerator,
) -> Result<DocumentTree> {
    let destination = tree
        .find_node(destination_uuid)
        .ok_or_else(|| ExplorerError::NotFound(destination_uuid.to_string()))?;
    if !destination.is_folder() {
        return Err(ExplorerError::NotAFolder(destination_uuid.to_string()));
    }

    let copies: Vec<DocRefNode> = uuids
        .iter()
        .filter_map(|uuid| match tree.find_node(uuid) {
            Some(node) => Some(clone_with_fresh_ids(node, ids)),
            None => {
                log::debug!("Copy: {} not present, skipping", uuid);
                None
            }
        })
        .collect();

    ensure_fresh_uuids(&tree.uuid_set(), &copies)?;

    let mut next = tree.clone();
    if let Some(destination) = next.find_node_mut(destination_uuid) {
        for copy in copies {
            destination.add_child(copy);
        }
    }
    Ok(next)
}

fn clone_with_fresh_ids(node: &DocRefNode, ids: &dyn IdGenerator) -> DocRefNode {
    DocRefNode {
        uuid: ids.next_id(),
        name: node.name.clone(),
        doc_type: node.doc_type.clone(),
        children: node.children.as_ref().map(|children| {
            children
                .iter()
                .map(|child| clone_with_fresh_ids(child, ids))
                .collect()
        }),
    }
}

/// Fail if any incoming uuid collides with the tree or with another incoming one
fn ensure_fresh_uuids(existing: &HashSet<String>, incoming: &[DocRefNode]) -> Result<()> {
    let mut seen = HashSet::new();
    let mut stack: Vec<&DocRefNode> = incoming.iter().collect();

    while let Some(node) = stack.pop() {
        if existing.contains(&node.uuid) || !seen.insert(node.uuid.as_str()) {
            return Err(ExplorerError::DuplicateUuid(node.uuid.clone()));
        }
        stack.extend(node.children());
    }

    Ok(())
}

/// Present uuids with no other requested uuid above them, deduplicated,
/// in request order
fn outermost(tree: &DocumentTree, uuids: &[String]) -> Vec<String> {
    let mut result: Vec<String> = Vec::new();
    for uuid in uuids {
        if !tree.contains(uuid) || result.contains(uuid) {
            continue;
        }
        let nested = uuids
            .iter()
            .any(|other| other != uuid && tree.is_in_subtree(other, uuid));
        if !nested {
            result.push(uuid.clone());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::{MockIdGenerator, SequentialIds};
    use assert_matches::assert_matches;

    fn create_test_tree() -> DocumentTree {
        DocumentTree::new(DocRefNode::new_folder("0", "System", "System").with_children(vec![
            DocRefNode::new_folder("a", "FolderA", "Folder").with_children(vec![
                DocRefNode::new_doc("d1", "Doc1", "X"),
                DocRefNode::new_folder("sub", "Sub", "Folder").with_children(vec![
                    DocRefNode::new_doc("d2", "Doc2", "Y"),
                ]),
            ]),
            DocRefNode::new_folder("b", "FolderB", "Folder"),
            DocRefNode::new_doc("d3", "Doc3", "X"),
        ]))
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn child_uuids(tree: &DocumentTree, uuid: &str) -> Vec<String> {
        tree.find_node(uuid)
            .unwrap()
            .children()
            .iter()
            .map(|n| n.uuid.clone())
            .collect()
    }

    #[test]
    fn test_create_appends() {
        let tree = create_test_tree();
        let next = create(&tree, "b", DocRefNode::new_doc("new", "New", "X")).unwrap();
        assert_eq!(child_uuids(&next, "b"), vec!["new"]);
        assert!(!tree.contains("new"));
    }

    #[test]
    fn test_create_errors() {
        let tree = create_test_tree();
        assert_matches!(
            create(&tree, "d3", DocRefNode::new_doc("new", "New", "X")),
            Err(ExplorerError::NotAFolder(uuid)) if uuid == "d3"
        );
        assert_matches!(
            create(&tree, "missing", DocRefNode::new_doc("new", "New", "X")),
            Err(ExplorerError::NotFound(_))
        );
        assert_matches!(
            create(&tree, "b", DocRefNode::new_doc("d1", "Dup", "X")),
            Err(ExplorerError::DuplicateUuid(uuid)) if uuid == "d1"
        );
    }

    #[test]
    fn test_rename() {
        let tree = create_test_tree();
        let next = rename(&tree, "a", "Renamed").unwrap();
        let node = next.find_node("a").unwrap();
        assert_eq!(node.name, "Renamed");
        assert_eq!(node.children().len(), 2);
        assert_eq!(node.doc_type, "Folder");

        assert_matches!(rename(&tree, "missing", "x"), Err(ExplorerError::NotFound(_)));
    }

    #[test]
    fn test_delete_skips_missing() {
        let tree = create_test_tree();
        let next = delete(&tree, &ids(&["sub", "missing", "d3"]));
        assert!(!next.contains("sub"));
        assert!(!next.contains("d2"));
        assert!(!next.contains("d3"));
        assert!(next.contains("d1"));
    }

    #[test]
    fn test_move_keeps_uuids_and_subtree() {
        let tree = create_test_tree();
        let next = move_nodes(&tree, &ids(&["sub", "d3"]), "b").unwrap();
        assert_eq!(child_uuids(&next, "b"), vec!["sub", "d3"]);
        assert_eq!(child_uuids(&next, "sub"), vec!["d2"]);
        assert_eq!(child_uuids(&next, "a"), vec!["d1"]);
        assert_eq!(next.get_stats().total_nodes, tree.get_stats().total_nodes);
    }

    #[test]
    fn test_move_nested_selection_moves_outer_only() {
        let tree = create_test_tree();
        let next = move_nodes(&tree, &ids(&["d2", "sub"]), "b").unwrap();
        assert_eq!(child_uuids(&next, "b"), vec!["sub"]);
        assert_eq!(child_uuids(&next, "sub"), vec!["d2"]);
    }

    #[test]
    fn test_move_errors() {
        let tree = create_test_tree();
        assert_matches!(
            move_nodes(&tree, &ids(&["a"]), "sub"),
            Err(ExplorerError::CyclicMove { moved, destination }) if moved == "a" && destination == "sub"
        );
        assert_matches!(
            move_nodes(&tree, &ids(&["a"]), "a"),
            Err(ExplorerError::CyclicMove { .. })
        );
        assert_matches!(
            move_nodes(&tree, &ids(&["d1"]), "d3"),
            Err(ExplorerError::NotAFolder(_))
        );
        assert_matches!(
            move_nodes(&tree, &ids(&["d1"]), "missing"),
            Err(ExplorerError::NotFound(_))
        );
        assert!(!can_move(&tree, &ids(&["0"]), "b"));
        assert!(can_move(&tree, &ids(&["d1", "d2"]), "b"));
    }

    #[test]
    fn test_copy_generates_fresh_uuids() {
        let tree = create_test_tree();
        let generator = SequentialIds::new("copy");
        let next = copy_nodes(&tree, &ids(&["a", "d3"]), "b", &generator).unwrap();

        let copied = child_uuids(&next, "b");
        assert_eq!(copied, vec!["copy-1", "copy-5"]);
        assert_eq!(child_uuids(&next, "copy-1"), vec!["copy-2", "copy-3"]);
        assert_eq!(child_uuids(&next, "copy-3"), vec!["copy-4"]);
        assert_eq!(next.find_node("copy-5").unwrap().name, "Doc3");

        let original = tree.uuid_set();
        let mut copied_uuids = Vec::new();
        for root in &copied {
            let subtree = DocumentTree::new(next.find_node(root).unwrap().clone());
            copied_uuids.extend(subtree.uuids());
        }
        assert!(copied_uuids.iter().all(|uuid| !original.contains(uuid)));
        // Originals untouched
        assert_eq!(child_uuids(&next, "a"), vec!["d1", "sub"]);
    }

    #[test]
    fn test_copy_into_itself() {
        let tree = create_test_tree();
        let generator = SequentialIds::new("c");
        let next = copy_nodes(&tree, &ids(&["sub"]), "sub", &generator).unwrap();
        assert_eq!(child_uuids(&next, "sub"), vec!["d2", "c-1"]);
        assert_eq!(child_uuids(&next, "c-1"), vec!["c-2"]);
    }

    #[test]
    fn test_copy_rejects_colliding_ids() {
        let tree = create_test_tree();
        let mut generator = MockIdGenerator::new();
        generator
            .expect_next_id()
            .times(1)
            .returning(|| "d1".to_string());

        assert_matches!(
            copy_nodes(&tree, &ids(&["d3"]), "b", &generator),
            Err(ExplorerError::DuplicateUuid(uuid)) if uuid == "d1"
        );
    }

    #[test]
    fn test_copy_errors() {
        let tree = create_test_tree();
        let generator = SequentialIds::new("c");
        assert_matches!(
            copy_nodes(&tree, &ids(&["d1"]), "d3", &generator),
            Err(ExplorerError::NotAFolder(_))
        );
        assert_matches!(
            copy_nodes(&tree, &ids(&["d1"]), "missing", &generator),
            Err(ExplorerError::NotFound(_))
        );
    }
}
