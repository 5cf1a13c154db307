//! Trace reconstruction from flat run records
//!
//! Stored runs arrive as a flat list per `trace_id`, ordered by creation.
//! Reconstruction picks the root and hangs every other record off it; runs
//! that already carry nested `child_runs` keep them and the walker descends
//! into those.

use crate::models::Run;

/// Merge the runs of one trace into a single tree.
///
/// The root is the run whose `id` equals the first record's `trace_id`,
/// falling back to the first record when no such run exists. All other
/// records are appended to the root's `child_runs`. An empty input yields
/// an empty run.
pub fn reconstruct(mut records: Vec<Run>) -> Run {
    if records.is_empty() {
        return Run::default();
    }
    if records.len() == 1 {
        return records.remove(0);
    }

    let root_index = records[0]
        .trace_id
        .as_deref()
        .and_then(|trace_id| records.iter().position(|run| run.id == trace_id))
        .unwrap_or(0);

    let mut root = records.remove(root_index);
    if root_index != 0 {
        tracing::trace!(root = %root.id, position = root_index, "Root run was not first in creation order");
    }

    root.child_runs.get_or_insert_with(Vec::new).extend(records);
    root
}
