use doc_explorer::action::Action;
use doc_explorer::engine::EngineState;
use doc_explorer::ids::UuidV4Generator;
use doc_explorer::open_state::OpenState;
use doc_explorer::tree::DocRefNode;
use fake::faker::lorem::en::Word;
use fake::Fake;
use proptest::prelude::*;
use proptest::sample::Index;
use std::collections::{BTreeSet, HashMap};

const TYPES: &[&str] = &["Feed", "XSLT", "Pipeline", "Index"];

/// One generated node: parent choice among earlier folders, folder flag, type
type NodeSpec = (Index, bool, usize);

fn build_tree(specs: Vec<NodeSpec>) -> DocRefNode {
    struct Flat {
        node: DocRefNode,
        children: Vec<usize>,
    }

    let mut flat = vec![Flat {
        node: DocRefNode::new_folder("root", "System", "System"),
        children: Vec::new(),
    }];
    let mut folders = vec![0];

    for (i, (parent, is_folder, type_index)) in specs.into_iter().enumerate() {
        let uuid = format!("n{}", i);
        let name: String = Word().fake();
        let node = if is_folder {
            DocRefNode::new_folder(uuid, name, "Folder")
        } else {
            DocRefNode::new_doc(uuid, name, TYPES[type_index])
        };

        let parent = folders[parent.index(folders.len())];
        flat.push(Flat {
            node,
            children: Vec::new(),
        });
        let index = flat.len() - 1;
        flat[parent].children.push(index);
        if is_folder {
            folders.push(index);
        }
    }

    fn assemble(flat: &[Flat], index: usize) -> DocRefNode {
        let entry = &flat[index];
        if entry.node.is_folder() {
            let children = entry.children.iter().map(|&c| assemble(flat, c)).collect();
            entry.node.clone().with_children(children)
        } else {
            entry.node.clone()
        }
    }

    assemble(&flat, 0)
}

fn arb_tree() -> impl Strategy<Value = DocRefNode> {
    prop::collection::vec((any::<Index>(), any::<bool>(), 0..TYPES.len()), 0..40)
        .prop_map(build_tree)
}

fn arb_filters() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set(prop::sample::select(TYPES.to_vec()), 0..3)
        .prop_map(|types| types.into_iter().map(str::to_string).collect())
}

fn loaded(tree: DocRefNode, type_filters: BTreeSet<String>) -> EngineState {
    let setup = Action::Sequence {
        actions: vec![
            Action::DocTreeReceived { tree },
            Action::ExplorerOpened {
                view_id: "main".to_string(),
                allow_multi_select: true,
                allow_drag_and_drop: false,
                type_filters,
            },
        ],
    };
    EngineState::default().apply(&setup).unwrap()
}

proptest! {
    #[test]
    fn visible_nodes_have_visible_ancestors(
        tree in arb_tree(),
        filters in arb_filters(),
        term in "[a-z]{0,3}",
    ) {
        let state = loaded(tree, filters)
            .apply(&Action::SearchTermChanged {
                view_id: "main".to_string(),
                search_term: term,
            })
            .unwrap();
        let view = state.views.get("main").unwrap();
        let tree = state.tree.as_ref().unwrap();

        tree.iterate_nodes(|lineage, node| {
            if view.state.visibility.is_visible(&node.uuid) {
                for ancestor in lineage {
                    assert!(
                        view.state.visibility.is_visible(&ancestor.uuid),
                        "{} visible but ancestor {} hidden",
                        node.uuid,
                        ancestor.uuid
                    );
                }
            }
        });
    }

    #[test]
    fn copies_never_collide(
        tree in arb_tree(),
        picks in prop::collection::vec(any::<Index>(), 1..4),
        destination in any::<Index>(),
    ) {
        let state = loaded(tree, BTreeSet::new());
        let tree = state.tree.as_ref().unwrap();
        let uuids = tree.uuids();
        let folders: Vec<String> = uuids
            .iter()
            .filter(|uuid| tree.find_node(uuid).is_some_and(DocRefNode::is_folder))
            .cloned()
            .collect();

        let picked: Vec<String> = picks.iter().map(|pick| pick.get(&uuids).clone()).collect();
        let destination = destination.get(&folders).clone();
        let copied_nodes: usize = picked
            .iter()
            .map(|uuid| {
                let mut count = 0;
                doc_explorer::tree::DocumentTree::new(tree.find_node(uuid).unwrap().clone())
                    .iterate_nodes(|_, _| count += 1);
                count
            })
            .sum();

        let next = state
            .apply_with(
                &Action::NodesCopied { uuids: picked, destination_uuid: destination },
                &UuidV4Generator,
            )
            .unwrap();
        let next_tree = next.tree.as_ref().unwrap();

        prop_assert_eq!(next_tree.first_duplicate_uuid(), None);
        prop_assert_eq!(next_tree.uuid_set().len(), uuids.len() + copied_nodes);
    }

    #[test]
    fn clearing_search_restores_open_states(
        tree in arb_tree(),
        toggles in prop::collection::vec(any::<Index>(), 0..6),
        term in "[a-z]{2,4}",
    ) {
        let mut state = loaded(tree, BTreeSet::new());
        let folders: Vec<String> = {
            let tree = state.tree.as_ref().unwrap();
            tree.uuids()
                .into_iter()
                .filter(|uuid| tree.find_node(uuid).is_some_and(DocRefNode::is_folder))
                .collect()
        };
        for toggle in toggles {
            state = state
                .apply(&Action::FolderToggled {
                    view_id: "main".to_string(),
                    uuid: toggle.get(&folders).clone(),
                })
                .unwrap();
        }
        let before: HashMap<String, OpenState> =
            state.views.get("main").unwrap().state.is_folder_open.clone();

        let search = |state: &EngineState, term: &str| {
            state
                .apply(&Action::SearchTermChanged {
                    view_id: "main".to_string(),
                    search_term: term.to_string(),
                })
                .unwrap()
        };
        let cleared = search(&search(&state, &term), "");

        prop_assert_eq!(&cleared.views.get("main").unwrap().state.is_folder_open, &before);
    }
}
