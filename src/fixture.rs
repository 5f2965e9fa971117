use crate::action::Action;
use crate::config::EngineConfig;
use crate::engine::EngineState;
use crate::error::Result;
use crate::tree::DocRefNode;
use std::collections::BTreeSet;

/// Every document type the sample tree uses
pub const SAMPLE_DOC_REF_TYPES: &[&str] = &[
    "Dictionary",
    "Feed",
    "Folder",
    "Index",
    "Pipeline",
    "System",
    "TextConverter",
    "XSLT",
];

/// A small content tree in the shape a document server hands out
pub fn sample_tree() -> DocRefNode {
    // System/
    //   Feeds and Translations/
    //     Internal/          DECORATION (XSLT), OUTPUT (XSLT)
    //     Test/              BITMAP-REFERENCE (Feed), DATA_SPLITTER-EVENTS (Feed),
    //                        DATA_SPLITTER-CONVERTER (TextConverter)
    //   Indexes/             Example Index (Index)
    //   Pipelines/           Event Data (Pipeline), Reference Loader (Pipeline)
    //   Dictionaries/        (empty)
    DocRefNode::new_folder("0", "System", "System").with_children(vec![
        DocRefNode::new_folder("feeds", "Feeds and Translations", "Folder").with_children(vec![
            DocRefNode::new_folder("internal", "Internal", "Folder").with_children(vec![
                DocRefNode::new_doc("decoration", "DECORATION", "XSLT"),
                DocRefNode::new_doc("output", "OUTPUT", "XSLT"),
            ]),
            DocRefNode::new_folder("test", "Test", "Folder").with_children(vec![
                DocRefNode::new_doc("bitmap-ref", "BITMAP-REFERENCE", "Feed"),
                DocRefNode::new_doc("splitter-events", "DATA_SPLITTER-EVENTS", "Feed"),
                DocRefNode::new_doc("splitter-converter", "DATA_SPLITTER-CONVERTER", "TextConverter"),
            ]),
        ]),
        DocRefNode::new_folder("indexes", "Indexes", "Folder").with_children(vec![
            DocRefNode::new_doc("example-index", "Example Index", "Index"),
        ]),
        DocRefNode::new_folder("pipelines", "Pipelines", "Folder").with_children(vec![
            DocRefNode::new_doc("event-data", "Event Data", "Pipeline"),
            DocRefNode::new_doc("reference-loader", "Reference Loader", "Pipeline"),
        ]),
        DocRefNode::new_folder("dictionaries", "Dictionaries", "Folder"),
    ])
}

/// Sample tree loaded with a multi-select `main` view and an XSLT-only
/// single-select `picker` view
pub fn sample_state() -> EngineState {
    sample_state_with(EngineConfig::default())
}

pub fn sample_state_with(config: EngineConfig) -> EngineState {
    let setup = Action::Sequence {
        actions: vec![
            Action::DocRefTypesReceived {
                types: SAMPLE_DOC_REF_TYPES.iter().map(|t| t.to_string()).collect(),
            },
            Action::DocTreeReceived {
                tree: sample_tree(),
            },
            Action::ExplorerOpened {
                view_id: "main".to_string(),
                allow_multi_select: true,
                allow_drag_and_drop: true,
                type_filters: BTreeSet::new(),
            },
            Action::ExplorerOpened {
                view_id: "picker".to_string(),
                allow_multi_select: false,
                allow_drag_and_drop: false,
                type_filters: ["XSLT".to_string()].into_iter().collect(),
            },
        ],
    };

    let initial = EngineState::new(config);
    // The sample tree has unique uuids and every target exists
    initial.apply(&setup).unwrap_or(initial)
}

/// Read a saved state and rebuild its derived data
pub fn load_state(path: &str) -> Result<EngineState> {
    let content = std::fs::read_to_string(path)?;
    let state: EngineState = serde_json::from_str(&content)?;
    Ok(state.rehydrated())
}

pub fn save_state(state: &EngineState, path: &str) -> Result<()> {
    std::fs::write(path, to_json(state)?)?;
    Ok(())
}

pub fn to_json(state: &EngineState) -> Result<String> {
    Ok(serde_json::to_string_pretty(state)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::open_state::OpenState;
    use tempfile::TempDir;

    #[test]
    fn test_sample_state() {
        let state = sample_state();
        assert_eq!(state.revision, 1);
        assert_eq!(state.doc_ref_types.len(), SAMPLE_DOC_REF_TYPES.len());
        assert_eq!(state.views.view_ids(), vec!["main", "picker"]);

        let main = state.views.get("main").unwrap();
        assert_eq!(main.state.open_state("0"), OpenState::OpenedByUser);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("state.json");
        let path = path.to_str().unwrap();

        let state = sample_state();
        save_state(&state, path).unwrap();
        let loaded = load_state(path).unwrap();

        assert_eq!(loaded, state);
    }

    #[test]
    fn test_load_missing_file() {
        assert!(load_state("/nonexistent/state.json").is_err());
    }
}
