//! Single and multi selection for one explorer view.

use crate::open_state::OpenState;
use crate::tree::{DocRefNode, DocumentTree};
use crate::visibility::Visibility;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "camelCase")]
pub enum Selection {
    #[serde(rename_all = "camelCase")]
    Single { selected_uuid: Option<String> },
    #[serde(rename_all = "camelCase")]
    Multi { is_selected: BTreeSet<String> },
}

/// What a click asked for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectModifiers {
    pub append: bool,
    pub contiguous: bool,
}

/// Derived view state the selection rules consult
pub struct SelectionContext<'a> {
    pub type_filters: &'a BTreeSet<String>,
    pub visibility: &'a Visibility,
    pub open_states: &'a HashMap<String, OpenState>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub selection: Selection,
    /// Selected uuids in tree traversal order
    pub selected_list: Vec<String>,
    /// Anchor for the next range selection
    pub last_selected_uuid: Option<String>,
}

impl SelectionState {
    pub fn new(allow_multi_select: bool) -> Self {
        let selection = if allow_multi_select {
            Selection::Multi {
                is_selected: BTreeSet::new(),
            }
        } else {
            Selection::Single {
                selected_uuid: None,
            }
        };

        Self {
            selection,
            selected_list: Vec::new(),
            last_selected_uuid: None,
        }
    }

    pub fn is_multi(&self) -> bool {
        matches!(self.selection, Selection::Multi { .. })
    }

    pub fn is_selected(&self, uuid: &str) -> bool {
        match &self.selection {
            Selection::Single { selected_uuid } => selected_uuid.as_deref() == Some(uuid),
            Selection::Multi { is_selected } => is_selected.contains(uuid),
        }
    }

    pub fn selected_uuid(&self) -> Option<&str> {
        match &self.selection {
            Selection::Single { selected_uuid } => selected_uuid.as_deref(),
            Selection::Multi { .. } => None,
        }
    }

    /// Handle a click on `uuid`. Clicks on unknown nodes are ignored.
    pub fn select(
        &mut self,
        tree: &DocumentTree,
        uuid: &str,
        modifiers: SelectModifiers,
        context: &SelectionContext<'_>,
    ) {
        let Some(node) = tree.find_node(uuid) else {
            log::debug!("Selection: ignoring click on unknown node {}", uuid);
            return;
        };

        let anchor = self.last_selected_uuid.clone();
        match &mut self.selection {
            Selection::Single { selected_uuid } => {
                // Deselecting is allowed even once the type filter excludes the node
                if selected_uuid.as_deref() == Some(uuid) {
                    *selected_uuid = None;
                } else if passes_type_filter(node, context.type_filters) {
                    *selected_uuid = Some(uuid.to_string());
                } else {
                    log::debug!(
                        "Selection: {} of type {} is outside the type filter",
                        uuid,
                        node.doc_type
                    );
                    return;
                }
            }
            Selection::Multi { is_selected } => {
                let range = match (modifiers.contiguous, anchor.as_deref()) {
                    (true, Some(anchor)) => range_between(tree, anchor, uuid, context),
                    _ => None,
                };

                match range {
                    Some(range) => is_selected.extend(range),
                    None if modifiers.append => {
                        if !is_selected.remove(uuid) {
                            is_selected.insert(uuid.to_string());
                        }
                    }
                    None => {
                        let was_selected = is_selected.contains(uuid);
                        is_selected.clear();
                        if !was_selected {
                            is_selected.insert(uuid.to_string());
                        }
                    }
                }
            }
        }

        self.last_selected_uuid = Some(uuid.to_string());
        self.refresh_list(tree);
    }

    /// Switch between single and multi mode, keeping what still fits
    pub fn set_multi_select(&mut self, allow_multi_select: bool, tree: Option<&DocumentTree>) {
        if allow_multi_select == self.is_multi() {
            return;
        }

        self.selection = match &self.selection {
            Selection::Single { selected_uuid } => Selection::Multi {
                is_selected: selected_uuid.iter().cloned().collect(),
            },
            Selection::Multi { .. } => Selection::Single {
                selected_uuid: self.selected_list.first().cloned(),
            },
        };

        match tree {
            Some(tree) => self.refresh_list(tree),
            None => self.selected_list.truncate(1),
        }
    }

    /// Drop every uuid that no longer exists in the tree
    pub fn prune(&mut self, tree: &DocumentTree) {
        let existing = tree.uuid_set();

        match &mut self.selection {
            Selection::Single { selected_uuid } => {
                if selected_uuid.as_ref().is_some_and(|uuid| !existing.contains(uuid)) {
                    *selected_uuid = None;
                }
            }
            Selection::Multi { is_selected } => {
                is_selected.retain(|uuid| existing.contains(uuid));
            }
        }

        if self
            .last_selected_uuid
            .as_ref()
            .is_some_and(|uuid| !existing.contains(uuid))
        {
            self.last_selected_uuid = None;
        }

        self.refresh_list(tree);
    }

    /// Rebuild the ordered selection list
    pub fn refresh_list(&mut self, tree: &DocumentTree) {
        let mut list = Vec::new();
        tree.iterate_nodes(|_, node| {
            if self.is_selected(&node.uuid) {
                list.push(node.uuid.clone());
            }
        });
        self.selected_list = list;
    }
}

fn passes_type_filter(node: &DocRefNode, type_filters: &BTreeSet<String>) -> bool {
    type_filters.is_empty() || type_filters.contains(&node.doc_type)
}

/// Nodes a user can currently reach by scrolling: pre-order, skipping the
/// subtrees of closed folders.
pub fn reachable_order(
    tree: &DocumentTree,
    open_states: &HashMap<String, OpenState>,
) -> Vec<String> {
    fn walk(node: &DocRefNode, open_states: &HashMap<String, OpenState>, order: &mut Vec<String>) {
        order.push(node.uuid.clone());

        let is_open = open_states
            .get(&node.uuid)
            .copied()
            .unwrap_or_default()
            .is_open();
        if node.is_folder() && is_open {
            for child in node.children() {
                walk(child, open_states, order);
            }
        }
    }

    let mut order = Vec::new();
    walk(&tree.root, open_states, &mut order);
    order
}

/// Visible nodes between two endpoints, both inclusive, in traversal order.
/// Returns `None` when either endpoint cannot be reached.
fn range_between(
    tree: &DocumentTree,
    anchor: &str,
    clicked: &str,
    context: &SelectionContext<'_>,
) -> Option<Vec<String>> {
    let order = reachable_order(tree, context.open_states);
    let anchor_index = order.iter().position(|uuid| uuid == anchor)?;
    let clicked_index = order.iter().position(|uuid| uuid == clicked)?;
    let (start, end) = if anchor_index <= clicked_index {
        (anchor_index, clicked_index)
    } else {
        (clicked_index, anchor_index)
    };

    Some(
        order[start..=end]
            .iter()
            .filter(|uuid| context.visibility.is_visible(uuid))
            .cloned()
            .collect(),
    )
}
