//! Per-view visibility of tree nodes.
//!
//! A node is visible when it passes both the search and the type filter
//! predicates, or when any of its descendants does. Ancestors of a passing
//! node are never hidden again once marked visible.

use crate::tree::{DocRefNode, DocumentTree};
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Visibility {
    pub is_visible: HashMap<String, bool>,
    pub in_search: HashMap<String, bool>,
    pub in_type_filter: HashMap<String, bool>,
}

impl Visibility {
    pub fn is_visible(&self, uuid: &str) -> bool {
        self.is_visible.get(uuid).copied().unwrap_or(false)
    }

    pub fn in_search(&self, uuid: &str) -> bool {
        self.in_search.get(uuid).copied().unwrap_or(false)
    }

    pub fn in_type_filter(&self, uuid: &str) -> bool {
        self.in_type_filter.get(uuid).copied().unwrap_or(false)
    }
}

/// Walk the tree once and evaluate both predicates for every node
pub fn compute<S, T>(tree: &DocumentTree, search: S, type_filter: T) -> Visibility
where
    S: Fn(&[&DocRefNode], &DocRefNode) -> bool,
    T: Fn(&[&DocRefNode], &DocRefNode) -> bool,
{
    let mut visibility = Visibility::default();

    tree.iterate_nodes(|lineage, node| {
        let in_search = search(lineage, node);
        let in_type_filter = type_filter(lineage, node);
        let passes = in_search && in_type_filter;

        visibility.in_search.insert(node.uuid.clone(), in_search);
        visibility
            .in_type_filter
            .insert(node.uuid.clone(), in_type_filter);

        let own = visibility.is_visible.entry(node.uuid.clone()).or_insert(false);
        *own |= passes;

        if passes {
            for ancestor in lineage {
                visibility.is_visible.insert(ancestor.uuid.clone(), true);
            }
        }
    });

    visibility
}

/// Search predicate from a set of matches; `None` means no active search
pub fn search_predicate(
    matches: Option<&HashSet<String>>,
) -> impl Fn(&[&DocRefNode], &DocRefNode) -> bool + '_ {
    move |_lineage: &[&DocRefNode], node: &DocRefNode| match matches {
        Some(matches) => matches.contains(&node.uuid),
        None => true,
    }
}

/// Type filter predicate. An empty filter set passes everything.
pub fn type_filter_predicate(
    filters: &BTreeSet<String>,
) -> impl Fn(&[&DocRefNode], &DocRefNode) -> bool + '_ {
    move |_lineage: &[&DocRefNode], node: &DocRefNode| {
        filters.is_empty() || filters.contains(&node.doc_type)
    }
}
