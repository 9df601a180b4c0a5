use std::collections::HashMap;

use uuid::Uuid;

use crate::messages::{Attachment, Reaction};

/// Distinct parent message ids held at once. Past this the whole buffer is
/// reset: bounded memory wins over completeness for never-arriving parents.
pub const PENDING_CAP: usize = 200;

#[derive(Debug, Clone)]
pub enum PendingChild {
    Attachment(Attachment),
    Reaction(Reaction),
}

impl PendingChild {
    pub fn message_id(&self) -> Uuid {
        match self {
            PendingChild::Attachment(attachment) => attachment.message_id,
            PendingChild::Reaction(reaction) => reaction.message_id,
        }
    }
}

/// Attachment/reaction events whose parent message is not yet known locally.
/// Entries replay once the parent appears, making cross-table delivery order
/// irrelevant to the final state.
#[derive(Default, Debug)]
pub struct PendingBuffer {
    children: HashMap<Uuid, Vec<PendingChild>>,
}

impl PendingBuffer {
    pub fn push(&mut self, child: PendingChild) {
        let message_id = child.message_id();
        if !self.children.contains_key(&message_id) && self.children.len() >= PENDING_CAP {
            log::warn!(
                "Pending buffer overflowed at {} parents, resetting",
                self.children.len()
            );
            self.children.clear();
        }
        let list = self.children.entry(message_id).or_default();
        // Upsert, not append: replaying a duplicate must not double-apply.
        let slot = list.iter_mut().find(|held| match (&child, held) {
            (PendingChild::Attachment(a), PendingChild::Attachment(b)) => a.id == b.id,
            (PendingChild::Reaction(a), PendingChild::Reaction(b)) => a.same_identity(b),
            _ => false,
        });
        match slot {
            Some(held) => *held = child,
            None => list.push(child),
        }
    }

    /// Drain everything held for a message that just became known.
    pub fn take(&mut self, message_id: &Uuid) -> Vec<PendingChild> {
        self.children.remove(message_id).unwrap_or_default()
    }

    pub fn parents(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn clear(&mut self) {
        self.children.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::test_fixtures::{attachment, reaction};

    #[test]
    fn duplicate_children_collapse() {
        let mut buffer = PendingBuffer::default();
        let message_id = Uuid::new_v4();
        let user_id = Uuid::new_v4();

        buffer.push(PendingChild::Reaction(reaction(message_id, user_id, "🌻")));
        buffer.push(PendingChild::Reaction(reaction(message_id, user_id, "🌻")));
        buffer.push(PendingChild::Reaction(reaction(message_id, user_id, "🥕")));
        let a = attachment(message_id, 1);
        buffer.push(PendingChild::Attachment(a.clone()));
        buffer.push(PendingChild::Attachment(a));

        let held = buffer.take(&message_id);
        assert_eq!(held.len(), 3);
        assert!(buffer.is_empty());
        assert!(buffer.take(&message_id).is_empty());
    }

    #[test]
    fn overflow_resets_wholesale() {
        let mut buffer = PendingBuffer::default();
        for _ in 0..PENDING_CAP {
            let message_id = Uuid::new_v4();
            buffer.push(PendingChild::Attachment(attachment(message_id, 1)));
        }
        assert_eq!(buffer.parents(), PENDING_CAP);

        // One more distinct parent trips the reset; the newcomer survives.
        let straw = Uuid::new_v4();
        buffer.push(PendingChild::Attachment(attachment(straw, 1)));
        assert_eq!(buffer.parents(), 1);
        assert_eq!(buffer.take(&straw).len(), 1);
    }

    #[test]
    fn known_parent_does_not_trip_overflow() {
        let mut buffer = PendingBuffer::default();
        let first = Uuid::new_v4();
        buffer.push(PendingChild::Attachment(attachment(first, 1)));
        for _ in 1..PENDING_CAP {
            buffer.push(PendingChild::Attachment(attachment(Uuid::new_v4(), 1)));
        }
        // A second child for an already-held parent fits without a reset.
        buffer.push(PendingChild::Attachment(attachment(first, 2)));
        assert_eq!(buffer.parents(), PENDING_CAP);
        assert_eq!(buffer.take(&first).len(), 2);
    }
}
