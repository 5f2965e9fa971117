use crate::{action::Action, engine::EngineState, error::ExplorerError, ids::IdGenerator};

/// Result of executing an action
#[derive(Debug)]
pub struct ExecutionResult {
    pub state: EngineState,
    pub status_message: Option<String>,
    /// Set when the action was rejected; `state` is then the input state
    pub error: Option<ExplorerError>,
}

impl ExecutionResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Executes actions against saved engine states
pub struct Executor;

impl Executor {
    /// Execute an action and return the resulting state
    pub fn execute(state: &EngineState, action: Action, ids: &dyn IdGenerator) -> ExecutionResult {
        match state.apply_with(&action, ids) {
            Ok(next) => {
                let status_message = Self::describe(state, &next, &action);
                ExecutionResult {
                    state: next,
                    status_message,
                    error: None,
                }
            }
            Err(e) => ExecutionResult {
                state: state.clone(),
                status_message: None,
                error: Some(e),
            },
        }
    }

    fn describe(before: &EngineState, after: &EngineState, action: &Action) -> Option<String> {
        let message = match action {
            Action::DocTreeReceived { .. } => {
                let stats = after.tree_stats()?;
                format!(
                    "Tree loaded: {} folders, {} documents",
                    stats.folders, stats.documents
                )
            }
            Action::DocRefTypesReceived { types } => format!("{} document types known", types.len()),
            Action::ExplorerOpened { view_id, .. } => format!("Opened {}", view_id),
            Action::ExplorerClosed { view_id } => format!("Closed {}", view_id),
            Action::SearchTermChanged {
                view_id,
                search_term,
            } => {
                let visible = after.visible_rows(view_id)?.len();
                format!("Search '{}' in {}: {} rows", search_term, view_id, visible)
            }
            Action::TypeFilterChanged { view_id, .. } | Action::TypeFiltersSelectAll { view_id, .. } => {
                let filters = after.snapshot(view_id)?.type_filters;
                format!("Type filter for {}: {:?}", view_id, filters)
            }
            Action::NodeSelected { view_id, .. } => {
                let selected = after.snapshot(view_id)?.is_selected_list;
                format!("Selected in {}: {}", view_id, selected.join(", "))
            }
            Action::NodesDeleted { .. }
            | Action::NodesMoved { .. }
            | Action::NodesCopied { .. }
            | Action::NodeCreated { .. }
            | Action::NodeRenamed { .. } => {
                let before_count = before.tree_stats().map(|s| s.total_nodes).unwrap_or(0);
                let after_count = after.tree_stats().map(|s| s.total_nodes).unwrap_or(0);
                format!(
                    "Tree updated to revision {} ({} -> {} nodes)",
                    after.revision, before_count, after_count
                )
            }
            Action::Sequence { actions } => format!("Applied {} actions", actions.len()),
            Action::FolderToggled { .. }
            | Action::ContextMenuOpened { .. }
            | Action::ContextMenuClosed { .. } => return None,
        };
        Some(message)
    }
}
