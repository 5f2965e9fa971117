//! Tri-state open flag for folders, per view.
//!
//! `OpenedByUser` records that the user asked for a folder to be open,
//! `OpenedBySearch` that an active search revealed it. Clearing a search only
//! collapses what the search opened.

use crate::tree::DocumentTree;
use crate::visibility::Visibility;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpenState {
    #[default]
    #[serde(rename = "closed")]
    Closed,
    #[serde(rename = "byUser")]
    OpenedByUser,
    #[serde(rename = "bySearch")]
    OpenedBySearch,
}

impl OpenState {
    pub fn is_open(self) -> bool {
        self != OpenState::Closed
    }

    /// User toggle: anything open closes, a closed folder opens by user
    pub fn toggled(self) -> Self {
        match self {
            OpenState::Closed => OpenState::OpenedByUser,
            OpenState::OpenedByUser | OpenState::OpenedBySearch => OpenState::Closed,
        }
    }

    /// Transition applied on every tree, search or filter recompute
    pub fn after_recompute(self, is_searching: bool, revealed_by_search: bool) -> Self {
        match (self, is_searching, revealed_by_search) {
            (OpenState::Closed, true, true) => OpenState::OpenedBySearch,
            (OpenState::OpenedBySearch, true, false) => OpenState::Closed,
            (OpenState::OpenedBySearch, false, _) => OpenState::Closed,
            (state, _, _) => state,
        }
    }
}

/// Recompute the open state of every folder in the tree.
///
/// Only folders get an entry; documents and uuids no longer in the tree are
/// dropped. When searching, a folder counts as revealed when it is visible,
/// i.e. it matches or contains a match. With `open_first_folder` the first
/// folder in traversal order is forced open by user.
pub fn recompute(
    tree: &DocumentTree,
    previous: &HashMap<String, OpenState>,
    is_searching: bool,
    visibility: &Visibility,
    open_first_folder: bool,
) -> HashMap<String, OpenState> {
    let mut states = HashMap::new();
    let mut first_folder_pending = open_first_folder;

    tree.iterate_nodes(|_, node| {
        if !node.is_folder() {
            return;
        }

        let current = previous.get(&node.uuid).copied().unwrap_or_default();
        let mut next = current.after_recompute(is_searching, visibility.is_visible(&node.uuid));

        if first_folder_pending {
            next = OpenState::OpenedByUser;
            first_folder_pending = false;
        }

        states.insert(node.uuid.clone(), next);
    });

    states
}
