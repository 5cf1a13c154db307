//! Report-shaped grouping of failures by symbol and root trace

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{ErrorDetail, Run};

/// `crypto_symbol -> root_trace_id -> entry`
pub type Hierarchy = BTreeMap<String, BTreeMap<String, HierarchyEntry>>;

/// Errors recorded under one root trace.
///
/// Serialized untagged: `Plain` is a bare JSON array, `WithMeta` an object
/// with `errors`, `start_time` and `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HierarchyEntry {
    /// Errors only
    Plain(Vec<ErrorDetail>),
    /// Errors plus the root run's start time and name
    WithMeta {
        /// Errors found under the root
        errors: Vec<ErrorDetail>,
        /// Root run start time
        start_time: Option<String>,
        /// Root run name
        name: String,
    },
}

impl HierarchyEntry {
    /// Empty entry for `root`, shaped by `include_metadata`
    pub fn for_root(root: &Run, include_metadata: bool) -> Self {
        if include_metadata {
            Self::WithMeta {
                errors: Vec::new(),
                start_time: root.start_time.clone(),
                name: root.name.clone(),
            }
        } else {
            Self::Plain(Vec::new())
        }
    }

    /// Errors in this entry
    pub fn errors(&self) -> &[ErrorDetail] {
        match self {
            Self::Plain(errors) | Self::WithMeta { errors, .. } => errors,
        }
    }

    /// Append an error
    pub fn push(&mut self, detail: ErrorDetail) {
        match self {
            Self::Plain(errors) | Self::WithMeta { errors, .. } => errors.push(detail),
        }
    }

    /// Consume the entry, keeping only its errors
    pub fn into_errors(self) -> Vec<ErrorDetail> {
        match self {
            Self::Plain(errors) | Self::WithMeta { errors, .. } => errors,
        }
    }
}

/// How the effective root of a failure was determined
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RootResolution<'a> {
    /// The run named by `trace_id` was found and carries `ls_run_depth == 0`
    Confirmed(&'a Run),
    /// The enclosing trace itself, used when the root could not be verified
    Fallback(&'a Run),
}

impl<'a> RootResolution<'a> {
    /// The resolved root run
    pub fn run(&self) -> &'a Run {
        match *self {
            Self::Confirmed(run) | Self::Fallback(run) => run,
        }
    }

    /// Whether the root was verified rather than guessed
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed(_))
    }
}

/// A hierarchy plus how many of its failures had verified roots
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HierarchyReport {
    /// The grouped errors
    pub hierarchy: Hierarchy,
    /// Failures whose root was confirmed
    pub confirmed_roots: usize,
    /// Failures attributed to a fallback root
    pub fallback_roots: usize,
}

impl HierarchyReport {
    /// Total number of errors across every symbol and root
    pub fn error_count(&self) -> usize {
        self.hierarchy
            .values()
            .flat_map(BTreeMap::values)
            .map(|entry| entry.errors().len())
            .sum()
    }

    /// Fold `other` into this report, appending errors under shared roots
    pub fn merge(&mut self, other: HierarchyReport) {
        self.confirmed_roots += other.confirmed_roots;
        self.fallback_roots += other.fallback_roots;

        for (symbol, roots) in other.hierarchy {
            let target = self.hierarchy.entry(symbol).or_default();
            for (root_id, entry) in roots {
                match target.entry(root_id) {
                    Entry::Vacant(slot) => {
                        slot.insert(entry);
                    }
                    Entry::Occupied(mut slot) => {
                        for detail in entry.into_errors() {
                            slot.get_mut().push(detail);
                        }
                    }
                }
            }
        }
    }
}
