//! Publish gating.

use crate::types::PresenceSnapshot;

/// True when nothing has been published yet or the snapshot differs from the
/// last one that was.
pub fn should_publish(next: &PresenceSnapshot, last_published: Option<&PresenceSnapshot>) -> bool {
    match last_published {
        None => true,
        Some(last) => last != next,
    }
}
