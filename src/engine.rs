//! The explorer engine state and its reducer.
//!
//! `EngineState` is an immutable value: `apply` returns the next state or an
//! error, and a failed action leaves the previous state untouched. Structural
//! commands rebuild the search index once and then reconcile every
//! registered view, open or retained.

use crate::action::Action;
use crate::config::{EngineConfig, SearchConfig};
use crate::error::{ExplorerError, Result};
use crate::ids::{IdGenerator, UuidV4Generator};
use crate::reconciler;
use crate::search::SearchIndex;
use crate::selection::SelectModifiers;
use crate::tree::{DocumentTree, TreeStats};
use crate::view::{ExplorerView, ViewRegistry, ViewSnapshot, VisibleRow};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub tree: Option<DocumentTree>,
    #[serde(skip)]
    index: SearchIndex,
    #[serde(default)]
    pub doc_ref_types: Vec<String>,
    #[serde(default)]
    pub views: ViewRegistry,
    /// Bumped by every applied structural command
    #[serde(default)]
    pub revision: u64,
    #[serde(default)]
    pub config: EngineConfig,
}

impl EngineState {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Rebuild derived data that is not serialized (the search index and
    /// per-view visibility) after loading a saved state. Views are fully
    /// reconciled since the loaded config may change whether a saved search
    /// term is still active.
    pub fn rehydrated(mut self) -> Self {
        if let Some(tree) = &self.tree {
            self.index = SearchIndex::build(tree);
            for (_, view) in self.views.iter_mut() {
                view.reconcile(Some(tree), &self.index, &self.config.search);
            }
        }
        self
    }

    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    pub fn apply(&self, action: &Action) -> Result<EngineState> {
        self.apply_with(action, &UuidV4Generator)
    }

    /// Apply an action, drawing uuids for copies from `ids`
    pub fn apply_with(&self, action: &Action, ids: &dyn IdGenerator) -> Result<EngineState> {
        let mut next = self.clone();
        if let Err(e) = next.reduce(action, ids) {
            if action.is_structural() {
                log::warn!("Rejected {}: {}", action_name(action), e);
            }
            return Err(e);
        }
        Ok(next)
    }

    /// Apply an action computed against `expected_revision`. If a structural
    /// command has landed since, the action is rejected as stale.
    pub fn apply_if_current(
        &self,
        expected_revision: u64,
        action: &Action,
        ids: &dyn IdGenerator,
    ) -> Result<EngineState> {
        if expected_revision != self.revision {
            log::warn!(
                "Discarding stale {}: expected revision {}, at {}",
                action_name(action),
                expected_revision,
                self.revision
            );
            return Err(ExplorerError::Stale {
                expected: expected_revision,
                current: self.revision,
            });
        }
        self.apply_with(action, ids)
    }

    fn reduce(&mut self, action: &Action, ids: &dyn IdGenerator) -> Result<()> {
        log::debug!("Applying {}", action_name(action));

        match action {
            Action::DocTreeReceived { tree } => {
                let tree = DocumentTree::new(tree.clone());
                if let Some(uuid) = tree.first_duplicate_uuid() {
                    return Err(ExplorerError::DuplicateUuid(uuid));
                }
                log::info!("Document tree received ({} nodes)", tree.get_stats().total_nodes);
                self.replace_tree(tree);
            }
            Action::DocRefTypesReceived { types } => {
                self.doc_ref_types = types.clone();
            }
            Action::ExplorerOpened {
                view_id,
                allow_multi_select,
                allow_drag_and_drop,
                type_filters,
            } => {
                let created = self.views.open(
                    view_id,
                    *allow_multi_select,
                    *allow_drag_and_drop,
                    type_filters.clone(),
                    self.tree.as_ref(),
                );
                log::info!(
                    "Explorer {} {}",
                    view_id,
                    if created { "opened" } else { "reopened" }
                );
                self.update_view(view_id, "open", |view, tree, index, search| {
                    view.reconcile(tree, index, search);
                });
            }
            Action::ExplorerClosed { view_id } => {
                if self.views.close(view_id) {
                    log::info!("Explorer {} closed", view_id);
                    if let Some(max_closed) = self.config.retention.max_closed_views {
                        for evicted in self.views.evict_closed(max_closed) {
                            log::info!("Explorer {} evicted", evicted);
                        }
                    }
                } else {
                    log::warn!("close: {} is not an open view, ignoring", view_id);
                }
            }
            Action::TypeFilterChanged {
                view_id,
                doc_type,
                included,
            } => {
                self.update_view(view_id, "filter", |view, tree, index, search| {
                    if *included {
                        view.config.type_filters.insert(doc_type.clone());
                    } else {
                        view.config.type_filters.remove(doc_type);
                    }
                    view.reconcile(tree, index, search);
                });
            }
            Action::TypeFiltersSelectAll { view_id, included } => {
                let known = self.doc_ref_types.clone();
                self.update_view(view_id, "filter_all", |view, tree, index, search| {
                    view.config.type_filters = if *included {
                        known.into_iter().collect()
                    } else {
                        Default::default()
                    };
                    view.reconcile(tree, index, search);
                });
            }
            Action::SearchTermChanged {
                view_id,
                search_term,
            } => {
                self.update_view(view_id, "search", |view, tree, index, search| {
                    view.config.search_term = search_term.clone();
                    view.reconcile(tree, index, search);
                });
            }
            Action::FolderToggled { view_id, uuid } => {
                self.update_view(view_id, "toggle", |view, tree, _, _| match tree {
                    Some(tree) => view.toggle_folder(tree, uuid),
                    None => log::warn!("toggle: no tree yet, ignoring"),
                });
            }
            Action::NodeSelected {
                view_id,
                uuid,
                append_selection,
                contiguous_selection,
            } => {
                let modifiers = SelectModifiers {
                    append: *append_selection,
                    contiguous: *contiguous_selection,
                };
                self.update_view(view_id, "select", |view, tree, _, _| match tree {
                    Some(tree) => view.select(tree, uuid, modifiers),
                    None => log::warn!("select: no tree yet, ignoring"),
                });
            }
            Action::ContextMenuOpened { view_id, uuid } => {
                self.update_view(view_id, "menu", |view, tree, _, _| {
                    if tree.is_some_and(|tree| tree.contains(uuid)) {
                        view.state.context_menu_uuid = Some(uuid.clone());
                    } else {
                        log::debug!("menu: {} not in tree, ignoring", uuid);
                    }
                });
            }
            Action::ContextMenuClosed { view_id } => {
                self.update_view(view_id, "menu_close", |view, _, _, _| {
                    view.state.context_menu_uuid = None;
                });
            }
            Action::NodeCreated { parent_uuid, node } => {
                let next = reconciler::create(self.current_tree()?, parent_uuid, node.clone())?;
                self.replace_tree(next);
            }
            Action::NodeRenamed { uuid, name } => {
                let next = reconciler::rename(self.current_tree()?, uuid, name)?;
                self.replace_tree(next);
            }
            Action::NodesDeleted { uuids } => {
                let next = reconciler::delete(self.current_tree()?, uuids);
                self.replace_tree(next);
            }
            Action::NodesMoved {
                uuids,
                destination_uuid,
            } => {
                let next = reconciler::move_nodes(self.current_tree()?, uuids, destination_uuid)?;
                self.replace_tree(next);
            }
            Action::NodesCopied {
                uuids,
                destination_uuid,
            } => {
                let next =
                    reconciler::copy_nodes(self.current_tree()?, uuids, destination_uuid, ids)?;
                self.replace_tree(next);
            }
            Action::Sequence { actions } => {
                for action in actions {
                    self.reduce(action, ids)?;
                }
            }
        }

        Ok(())
    }

    fn current_tree(&self) -> Result<&DocumentTree> {
        self.tree.as_ref().ok_or(ExplorerError::NoTree)
    }

    /// Install a new canonical tree, rebuild the index once and reconcile
    /// every registered view against it
    fn replace_tree(&mut self, tree: DocumentTree) {
        self.index = SearchIndex::build(&tree);
        for (view_id, view) in self.views.iter_mut() {
            view.reconcile(Some(&tree), &self.index, &self.config.search);
            log::debug!(
                "Reconciled {}: {} selected",
                view_id,
                view.state.selection.selected_list.len()
            );
        }
        self.tree = Some(tree);
        self.revision += 1;
    }

    fn update_view<F>(&mut self, view_id: &str, action: &str, update: F)
    where
        F: FnOnce(&mut ExplorerView, Option<&DocumentTree>, &SearchIndex, &SearchConfig),
    {
        let Self {
            tree,
            index,
            views,
            config,
            ..
        } = self;
        match views.get_mut(view_id) {
            Some(view) => update(view, tree.as_ref(), &*index, &config.search),
            None => log::warn!("{}: unknown view {}, ignoring", action, view_id),
        }
    }

    /// Drag-and-drop predicate: the view allows dragging and the move is legal
    pub fn can_drop(&self, view_id: &str, uuids: &[String], destination_uuid: &str) -> bool {
        let allowed = self
            .views
            .get(view_id)
            .is_some_and(|view| view.config.allow_drag_and_drop);
        allowed
            && self
                .tree
                .as_ref()
                .is_some_and(|tree| reconciler::can_move(tree, uuids, destination_uuid))
    }

    pub fn snapshot(&self, view_id: &str) -> Option<ViewSnapshot> {
        self.views.get(view_id).map(|view| view.snapshot(view_id))
    }

    pub fn snapshots(&self) -> Vec<ViewSnapshot> {
        self.views
            .iter()
            .map(|(view_id, view)| view.snapshot(view_id))
            .collect()
    }

    /// Rows a renderer would draw for a view. Empty until a tree arrives.
    pub fn visible_rows(&self, view_id: &str) -> Option<Vec<VisibleRow>> {
        let view = self.views.get(view_id)?;
        Some(
            self.tree
                .as_ref()
                .map(|tree| view.visible_rows(tree))
                .unwrap_or_default(),
        )
    }

    pub fn tree_stats(&self) -> Option<TreeStats> {
        self.tree.as_ref().map(DocumentTree::get_stats)
    }
}

fn action_name(action: &Action) -> &'static str {
    match action {
        Action::DocTreeReceived { .. } => "DOC_TREE_RECEIVED",
        Action::DocRefTypesReceived { .. } => "DOC_REF_TYPES_RECEIVED",
        Action::ExplorerOpened { .. } => "EXPLORER_OPENED",
        Action::ExplorerClosed { .. } => "EXPLORER_CLOSED",
        Action::TypeFilterChanged { .. } => "TYPE_FILTER_CHANGED",
        Action::TypeFiltersSelectAll { .. } => "TYPE_FILTERS_SELECT_ALL",
        Action::SearchTermChanged { .. } => "SEARCH_TERM_CHANGED",
        Action::FolderToggled { .. } => "FOLDER_TOGGLED",
        Action::NodeSelected { .. } => "NODE_SELECTED",
        Action::ContextMenuOpened { .. } => "CONTEXT_MENU_OPENED",
        Action::ContextMenuClosed { .. } => "CONTEXT_MENU_CLOSED",
        Action::NodeCreated { .. } => "NODE_CREATED",
        Action::NodeRenamed { .. } => "NODE_RENAMED",
        Action::NodesDeleted { .. } => "NODES_DELETED",
        Action::NodesMoved { .. } => "NODES_MOVED",
        Action::NodesCopied { .. } => "NODES_COPIED",
        Action::Sequence { .. } => "SEQUENCE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::open_state::OpenState;
    use crate::tree::DocRefNode;
    use assert_matches::assert_matches;

    fn create_test_tree() -> DocRefNode {
        DocRefNode::new_folder("0", "System", "System").with_children(vec![
            DocRefNode::new_folder("a", "FolderA", "Folder").with_children(vec![
                DocRefNode::new_doc("d1", "Doc1", "X"),
                DocRefNode::new_doc("d2", "Doc2", "Y"),
            ]),
            DocRefNode::new_folder("b", "FolderB", "Folder"),
        ])
    }

    fn run(state: &EngineState, commands: &[&str]) -> EngineState {
        let ids = SequentialIds::new("copy");
        commands.iter().fold(state.clone(), |state, command| {
            state
                .apply_with(&Action::from_string(command).unwrap(), &ids)
                .unwrap()
        })
    }

    fn loaded() -> EngineState {
        EngineState::default()
            .apply(&Action::DocTreeReceived {
                tree: create_test_tree(),
            })
            .unwrap()
    }

    #[test]
    fn test_tree_received_bumps_revision() {
        let state = loaded();
        assert_eq!(state.revision, 1);
        assert_eq!(state.index().len(), 5);
        assert_eq!(state.tree_stats().unwrap().documents, 2);
    }

    #[test]
    fn test_structural_command_without_tree() {
        let state = EngineState::default();
        let result = state.apply(&Action::from_string("rename:a:New").unwrap());
        assert_matches!(result, Err(ExplorerError::NoTree));
    }

    #[test]
    fn test_duplicate_tree_rejected() {
        let tree = DocRefNode::new_folder("0", "System", "System").with_children(vec![
            DocRefNode::new_doc("x", "One", "X"),
            DocRefNode::new_doc("x", "Two", "X"),
        ]);
        let result = EngineState::default().apply(&Action::DocTreeReceived { tree });
        assert_matches!(result, Err(ExplorerError::DuplicateUuid(uuid)) if uuid == "x");
    }

    #[test]
    fn test_failed_action_leaves_state_unchanged() {
        let state = run(&loaded(), &["open:main:multi", "select:main:d1"]);
        let result = state.apply(&Action::from_string("move:a:d1").unwrap());
        assert_matches!(result, Err(ExplorerError::NotAFolder(_)));

        // A failing step aborts the whole sequence
        let result = state.apply(&Action::from_string("sequence:[delete:d1|rename:zz:x]").unwrap());
        assert_matches!(result, Err(ExplorerError::NotFound(_)));
        assert!(state.tree.as_ref().unwrap().contains("d1"));
        assert_eq!(state.revision, 1);
    }

    #[test]
    fn test_open_before_tree_then_first_folder_opens() {
        let state = run(&EngineState::default(), &["open:main"]);
        assert!(state.views.get("main").unwrap().state.initial_open_pending);

        let state = state
            .apply(&Action::DocTreeReceived {
                tree: create_test_tree(),
            })
            .unwrap();
        let view = state.views.get("main").unwrap();
        assert_eq!(view.state.open_state("0"), OpenState::OpenedByUser);
        assert_eq!(view.state.open_state("a"), OpenState::Closed);
    }

    #[test]
    fn test_unknown_view_is_ignored() {
        let state = loaded();
        let next = run(&state, &["toggle:ghost:a", "search:ghost:doc", "close:ghost"]);
        assert_eq!(next, state);
    }

    #[test]
    fn test_select_all_type_filters() {
        let state = run(&loaded(), &["types:X,Y,Folder", "open:main", "filter_all:main:on"]);
        assert_eq!(
            state.views.get("main").unwrap().config.type_filters.len(),
            3
        );

        let state = run(&state, &["filter_all:main:off"]);
        assert!(state.views.get("main").unwrap().config.type_filters.is_empty());
    }

    #[test]
    fn test_context_menu() {
        let state = run(&loaded(), &["open:main", "menu:main:d1"]);
        assert_eq!(
            state.snapshot("main").unwrap().context_menu_uuid.as_deref(),
            Some("d1")
        );

        let deleted = run(&state, &["delete:a"]);
        assert_eq!(deleted.snapshot("main").unwrap().context_menu_uuid, None);

        let closed = run(&state, &["menu_close:main"]);
        assert_eq!(closed.snapshot("main").unwrap().context_menu_uuid, None);
    }

    #[test]
    fn test_apply_if_current() {
        let state = loaded();
        let ids = SequentialIds::new("copy");
        let rename = Action::from_string("rename:d1:Renamed").unwrap();

        let next = state.apply_if_current(1, &rename, &ids).unwrap();
        assert_eq!(next.revision, 2);

        let result = next.apply_if_current(1, &rename, &ids);
        assert_matches!(result, Err(ExplorerError::Stale { expected: 1, current: 2 }));
    }

    #[test]
    fn test_can_drop() {
        let state = run(&loaded(), &["open:main:dnd", "open:picker"]);
        let moved = vec!["a".to_string()];
        assert!(state.can_drop("main", &moved, "b"));
        assert!(!state.can_drop("main", &moved, "a"));
        assert!(!state.can_drop("main", &moved, "d1"));
        assert!(!state.can_drop("picker", &moved, "b"));
        assert!(!state.can_drop("ghost", &moved, "b"));
    }

    #[test]
    fn test_closed_view_eviction() {
        let mut state = loaded();
        state.config.retention.max_closed_views = Some(1);
        let state = run(&state, &["open:one", "open:two", "close:one", "close:two"]);
        assert_eq!(state.views.view_ids(), vec!["two"]);
    }

    #[test]
    fn test_rehydrate_after_serde() {
        let state = run(&loaded(), &["open:main", "search:main:doc1"]);
        let json = serde_json::to_string(&state).unwrap();
        let restored: EngineState = serde_json::from_str(&json).unwrap();
        let restored = restored.rehydrated();

        assert_eq!(restored.index().len(), state.index().len());
        assert_eq!(restored.snapshot("main"), state.snapshot("main"));
    }
}
