//! Explorer views and the registry that owns them.
//!
//! Every view renders the same canonical tree with its own search term,
//! type filter, open folders and selection. Views only hold derived state,
//! never a copy of the tree structure.

use crate::config::SearchConfig;
use crate::open_state::{self, OpenState};
use crate::search::{is_search_active, SearchIndex};
use crate::selection::{SelectModifiers, Selection, SelectionContext, SelectionState};
use crate::tree::{DocRefNode, DocumentTree};
use crate::visibility::{self, Visibility};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewConfig {
    pub allow_multi_select: bool,
    pub allow_drag_and_drop: bool,
    pub type_filters: BTreeSet<String>,
    pub search_term: String,
}

/// Derived state, recomputed whenever the tree or the view config changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    #[serde(skip)]
    pub visibility: Visibility,
    pub is_folder_open: HashMap<String, OpenState>,
    pub selection: SelectionState,
    pub context_menu_uuid: Option<String>,
    /// Set until the first recompute against a real tree
    pub initial_open_pending: bool,
}

impl ViewState {
    pub fn new(allow_multi_select: bool) -> Self {
        Self {
            visibility: Visibility::default(),
            is_folder_open: HashMap::new(),
            selection: SelectionState::new(allow_multi_select),
            context_menu_uuid: None,
            initial_open_pending: true,
        }
    }

    pub fn open_state(&self, uuid: &str) -> OpenState {
        self.is_folder_open.get(uuid).copied().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplorerView {
    pub config: ViewConfig,
    pub state: ViewState,
    pub is_open: bool,
    /// Close order, used to evict the oldest retained views first
    pub closed_seq: Option<u64>,
}

impl ExplorerView {
    pub fn new(config: ViewConfig) -> Self {
        let state = ViewState::new(config.allow_multi_select);
        Self {
            config,
            state,
            is_open: true,
            closed_seq: None,
        }
    }

    pub fn is_searching(&self, search_config: &SearchConfig) -> bool {
        is_search_active(&self.config.search_term, search_config)
    }

    /// Re-derive visibility and open states from the tree, then prune
    /// selection and context menu entries that no longer exist
    pub fn reconcile(
        &mut self,
        tree: Option<&DocumentTree>,
        index: &SearchIndex,
        search_config: &SearchConfig,
    ) {
        let Some(tree) = tree else {
            return;
        };

        self.refresh_visibility(tree, index, search_config);
        self.state.is_folder_open = open_state::recompute(
            tree,
            &self.state.is_folder_open,
            self.is_searching(search_config),
            &self.state.visibility,
            self.state.initial_open_pending,
        );
        self.state.initial_open_pending = false;

        self.state.selection.prune(tree);
        if self
            .state
            .context_menu_uuid
            .as_ref()
            .is_some_and(|uuid| !tree.contains(uuid))
        {
            self.state.context_menu_uuid = None;
        }
    }

    /// Recompute visibility only, leaving open states alone
    pub fn refresh_visibility(
        &mut self,
        tree: &DocumentTree,
        index: &SearchIndex,
        search_config: &SearchConfig,
    ) {
        let matches = index.matches_for(&self.config.search_term, search_config);
        self.state.visibility = visibility::compute(
            tree,
            visibility::search_predicate(matches.as_ref()),
            visibility::type_filter_predicate(&self.config.type_filters),
        );
    }

    /// User toggle of a folder. Documents and unknown uuids are ignored.
    pub fn toggle_folder(&mut self, tree: &DocumentTree, uuid: &str) {
        match tree.find_node(uuid) {
            Some(node) if node.is_folder() => {
                let next = self.state.open_state(uuid).toggled();
                self.state.is_folder_open.insert(uuid.to_string(), next);
            }
            _ => log::debug!("Toggle: {} is not a folder in the tree", uuid),
        }
    }

    pub fn select(&mut self, tree: &DocumentTree, uuid: &str, modifiers: SelectModifiers) {
        let context = SelectionContext {
            type_filters: &self.config.type_filters,
            visibility: &self.state.visibility,
            open_states: &self.state.is_folder_open,
        };
        self.state.selection.select(tree, uuid, modifiers, &context);
    }

    /// Rows a renderer would draw: visible nodes in order, children of
    /// closed folders left out
    pub fn visible_rows(&self, tree: &DocumentTree) -> Vec<VisibleRow> {
        let mut rows = Vec::new();
        self.collect_visible_rows(&tree.root, 0, &mut rows);
        rows
    }

    fn collect_visible_rows(&self, node: &DocRefNode, depth: usize, rows: &mut Vec<VisibleRow>) {
        if !self.state.visibility.is_visible(&node.uuid) {
            return;
        }

        let open_state = self.state.open_state(&node.uuid);
        rows.push(VisibleRow {
            uuid: node.uuid.clone(),
            name: node.name.clone(),
            doc_type: node.doc_type.clone(),
            depth,
            is_folder: node.is_folder(),
            open_state,
            is_selected: self.state.selection.is_selected(&node.uuid),
        });

        if node.is_folder() && open_state.is_open() {
            for child in node.children() {
                self.collect_visible_rows(child, depth + 1, rows);
            }
        }
    }

    pub fn snapshot(&self, view_id: &str) -> ViewSnapshot {
        let (is_selected, selected_uuid) = match &self.state.selection.selection {
            Selection::Single { selected_uuid } => (None, selected_uuid.clone()),
            Selection::Multi { is_selected } => (
                Some(
                    is_selected
                        .iter()
                        .map(|uuid| (uuid.clone(), true))
                        .collect(),
                ),
                None,
            ),
        };

        ViewSnapshot {
            view_id: view_id.to_string(),
            is_open: self.is_open,
            allow_multi_select: self.config.allow_multi_select,
            allow_drag_and_drop: self.config.allow_drag_and_drop,
            search_term: self.config.search_term.clone(),
            type_filters: self.config.type_filters.clone(),
            is_visible: self
                .state
                .visibility
                .is_visible
                .iter()
                .map(|(uuid, visible)| (uuid.clone(), *visible))
                .collect(),
            is_folder_open: self
                .state
                .is_folder_open
                .iter()
                .map(|(uuid, state)| (uuid.clone(), *state))
                .collect(),
            is_selected,
            selected_uuid,
            is_selected_list: self.state.selection.selected_list.clone(),
            last_selected_uuid: self.state.selection.last_selected_uuid.clone(),
            context_menu_uuid: self.state.context_menu_uuid.clone(),
        }
    }
}

/// One drawable row of a view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleRow {
    pub uuid: String,
    pub name: String,
    pub doc_type: String,
    pub depth: usize,
    pub is_folder: bool,
    pub open_state: OpenState,
    pub is_selected: bool,
}

/// Read surface of a view, with ordered maps for stable output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub view_id: String,
    pub is_open: bool,
    pub allow_multi_select: bool,
    pub allow_drag_and_drop: bool,
    pub search_term: String,
    pub type_filters: BTreeSet<String>,
    pub is_visible: BTreeMap<String, bool>,
    pub is_folder_open: BTreeMap<String, OpenState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_selected: Option<BTreeMap<String, bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_uuid: Option<String>,
    pub is_selected_list: Vec<String>,
    pub last_selected_uuid: Option<String>,
    pub context_menu_uuid: Option<String>,
}

/// All views by id, open or retained after closing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRegistry {
    views: BTreeMap<String, ExplorerView>,
    close_counter: u64,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a view. A retained view keeps its search term, open folders and
    /// selection but takes the supplied settings. Returns true when the view
    /// was created.
    pub fn open(
        &mut self,
        view_id: &str,
        allow_multi_select: bool,
        allow_drag_and_drop: bool,
        type_filters: BTreeSet<String>,
        tree: Option<&DocumentTree>,
    ) -> bool {
        match self.views.get_mut(view_id) {
            Some(view) => {
                view.config.allow_multi_select = allow_multi_select;
                view.config.allow_drag_and_drop = allow_drag_and_drop;
                view.config.type_filters = type_filters;
                view.state
                    .selection
                    .set_multi_select(allow_multi_select, tree);
                view.is_open = true;
                view.closed_seq = None;
                false
            }
            None => {
                let config = ViewConfig {
                    allow_multi_select,
                    allow_drag_and_drop,
                    type_filters,
                    search_term: String::new(),
                };
                self.views
                    .insert(view_id.to_string(), ExplorerView::new(config));
                true
            }
        }
    }

    /// Mark a view closed, keeping its state for a later reopen
    pub fn close(&mut self, view_id: &str) -> bool {
        match self.views.get_mut(view_id) {
            Some(view) if view.is_open => {
                self.close_counter += 1;
                view.is_open = false;
                view.closed_seq = Some(self.close_counter);
                true
            }
            _ => false,
        }
    }

    /// Drop the oldest closed views beyond `max_closed`. Open views stay.
    pub fn evict_closed(&mut self, max_closed: usize) -> Vec<String> {
        let mut closed: Vec<(u64, String)> = self
            .views
            .iter()
            .filter_map(|(id, view)| view.closed_seq.map(|seq| (seq, id.clone())))
            .collect();
        if closed.len() <= max_closed {
            return Vec::new();
        }

        closed.sort();
        let excess = closed.len() - max_closed;
        closed
            .into_iter()
            .take(excess)
            .map(|(_, id)| {
                self.views.remove(&id);
                id
            })
            .collect()
    }

    pub fn get(&self, view_id: &str) -> Option<&ExplorerView> {
        self.views.get(view_id)
    }

    pub fn get_mut(&mut self, view_id: &str) -> Option<&mut ExplorerView> {
        self.views.get_mut(view_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ExplorerView)> {
        self.views.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut ExplorerView)> {
        self.views.iter_mut()
    }

    pub fn view_ids(&self) -> Vec<String> {
        self.views.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_tree() -> DocumentTree {
        DocumentTree::new(DocRefNode::new_folder("0", "System", "System").with_children(vec![
            DocRefNode::new_folder("a", "FolderA", "Folder").with_children(vec![
                DocRefNode::new_doc("d1", "Doc1", "X"),
                DocRefNode::new_doc("d2", "Doc2", "Y"),
            ]),
            DocRefNode::new_doc("d3", "Doc3", "X"),
        ]))
    }

    #[test]
    fn test_registry_open_close_reopen() {
        let tree = create_test_tree();
        let mut registry = ViewRegistry::new();
        assert!(registry.open("main", true, false, BTreeSet::new(), Some(&tree)));
        registry.get_mut("main").unwrap().config.search_term = "doc".to_string();

        assert!(registry.close("main"));
        assert!(!registry.close("main"));
        assert!(!registry.get("main").unwrap().is_open);

        assert!(!registry.open("main", true, true, BTreeSet::new(), Some(&tree)));
        let view = registry.get("main").unwrap();
        assert!(view.is_open);
        assert!(view.config.allow_drag_and_drop);
        assert_eq!(view.config.search_term, "doc");
    }

    #[test]
    fn test_evict_oldest_closed() {
        let mut registry = ViewRegistry::new();
        for id in ["a", "b", "c", "open"] {
            registry.open(id, false, false, BTreeSet::new(), None);
        }
        registry.close("b");
        registry.close("a");
        registry.close("c");

        let evicted = registry.evict_closed(1);
        assert_eq!(evicted, vec!["b", "a"]);
        assert_eq!(registry.view_ids(), vec!["c", "open"]);
        assert!(registry.evict_closed(1).is_empty());
    }

    #[test]
    fn test_reconcile_and_visible_rows() {
        let tree = create_test_tree();
        let index = SearchIndex::build(&tree);
        let config = SearchConfig::default();
        let mut view = ExplorerView::new(ViewConfig::default());

        view.reconcile(Some(&tree), &index, &config);
        assert_eq!(view.state.open_state("0"), OpenState::OpenedByUser);
        assert!(!view.state.initial_open_pending);

        let rows: Vec<String> = view.visible_rows(&tree).into_iter().map(|r| r.uuid).collect();
        assert_eq!(rows, vec!["0", "a", "d3"]);

        view.toggle_folder(&tree, "a");
        let rows = view.visible_rows(&tree);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[2].uuid, "d1");
        assert_eq!(rows[2].depth, 2);
    }

    #[test]
    fn test_toggle_ignores_documents() {
        let tree = create_test_tree();
        let mut view = ExplorerView::new(ViewConfig::default());
        view.toggle_folder(&tree, "d1");
        view.toggle_folder(&tree, "missing");
        assert!(view.state.is_folder_open.is_empty());
    }

    #[test]
    fn test_reconcile_without_tree_keeps_pending() {
        let mut view = ExplorerView::new(ViewConfig::default());
        view.reconcile(None, &SearchIndex::default(), &SearchConfig::default());
        assert!(view.state.initial_open_pending);
    }

    #[test]
    fn test_snapshot_single_vs_multi() {
        let tree = create_test_tree();
        let index = SearchIndex::build(&tree);
        let mut single = ExplorerView::new(ViewConfig::default());
        single.reconcile(Some(&tree), &index, &SearchConfig::default());
        single.select(&tree, "d1", SelectModifiers::default());

        let snapshot = single.snapshot("single");
        assert_eq!(snapshot.selected_uuid.as_deref(), Some("d1"));
        assert!(snapshot.is_selected.is_none());

        let mut multi = ExplorerView::new(ViewConfig {
            allow_multi_select: true,
            ..ViewConfig::default()
        });
        multi.reconcile(Some(&tree), &index, &SearchConfig::default());
        multi.select(&tree, "d1", SelectModifiers::default());
        let snapshot = multi.snapshot("multi");
        assert_eq!(snapshot.is_selected.unwrap().get("d1"), Some(&true));
        assert_eq!(snapshot.is_selected_list, vec!["d1"]);
    }
}
