//! Process instance tree paths.
//!
//! Ancestry between parent and child process instances is encoded as a
//! single path string, so hierarchy queries need no recursive lookups. A
//! root instance's path is its own key; a child spawned by a call activity
//! appends the call activity element id, the call activity's flow node
//! instance key, and its own key to the parent's path:
//!
//! `parentPath/callActivityId/flowNodeInstanceKey/processInstanceKey`

use strand_core::Key;

/// Separator between tree path segments.
pub const SEPARATOR: char = '/';

/// The tree path of a root process instance.
#[must_use]
pub fn root(process_instance_key: Key) -> String {
    process_instance_key.to_string()
}

/// The tree path of a child process instance spawned by a call activity.
#[must_use]
pub fn child(
    parent_tree_path: &str,
    call_activity_id: &str,
    call_activity_instance_key: Key,
    process_instance_key: Key,
) -> String {
    format!(
        "{parent_tree_path}{SEPARATOR}{call_activity_id}{SEPARATOR}{call_activity_instance_key}{SEPARATOR}{process_instance_key}"
    )
}
