//! Searchable index over the document tree.
//!
//! The index is a flat list of records, one per node, holding the node name
//! and the space-joined names of its ancestors. It is rebuilt in full every
//! time the canonical tree changes; there is no incremental update.

use crate::config::SearchConfig;
use crate::tree::DocumentTree;
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use std::collections::HashSet;
use std::time::Instant;

/// One indexed node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRecord {
    pub uuid: String,
    pub name: String,
    pub lineage_names: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchIndex {
    records: Vec<SearchRecord>,
}

/// Whether a search term is long enough to count as an active search
pub fn is_search_active(term: &str, config: &SearchConfig) -> bool {
    term.trim().chars().count() >= config.min_term_length
}

impl SearchIndex {
    /// Build an index with one record per node, in traversal order
    pub fn build(tree: &DocumentTree) -> Self {
        let start = Instant::now();
        let mut records = Vec::new();

        tree.iterate_nodes(|lineage, node| {
            let lineage_names = lineage
                .iter()
                .map(|ancestor| ancestor.name.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            records.push(SearchRecord {
                uuid: node.uuid.clone(),
                name: node.name.clone(),
                lineage_names,
            });
        });

        log::debug!(
            "Search index: built {} records in {:?}",
            records.len(),
            start.elapsed()
        );

        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Uuids of every record whose name or lineage fuzzy-matches `term`
    pub fn query(&self, term: &str, config: &SearchConfig) -> HashSet<String> {
        let term = term.trim();
        let matcher = if config.ignore_case {
            SkimMatcherV2::default().ignore_case()
        } else {
            SkimMatcherV2::default().respect_case()
        };

        let start = Instant::now();
        let matches: HashSet<String> = self
            .records
            .iter()
            .filter(|record| {
                matcher.fuzzy_match(&record.name, term).is_some()
                    || matcher.fuzzy_match(&record.lineage_names, term).is_some()
            })
            .map(|record| record.uuid.clone())
            .collect();

        log::debug!(
            "Search: '{}' matched {} of {} records in {:?}",
            term,
            matches.len(),
            self.records.len(),
            start.elapsed()
        );

        matches
    }

    /// Matches for an active search, or `None` when the term is too short
    /// and the search should be treated as matching everything
    pub fn matches_for(&self, term: &str, config: &SearchConfig) -> Option<HashSet<String>> {
        if is_search_active(term, config) {
            Some(self.query(term, config))
        } else {
            None
        }
    }
}
