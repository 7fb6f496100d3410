use std::collections::VecDeque;

/// Ticket handed back by `enqueue`. The enqueuing process parks until the
/// drainer has popped its ticket and `take_handled` reports true.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ActionId(u64);

/// FIFO barrier between the periodic processes and the one reaction that is
/// allowed to play at a time. Strictly first enqueued, first drained.
#[derive(Debug, Default)]
pub(crate) struct ActionQueue {
    next_id: u64,
    pending: VecDeque<ActionId>,
    handled: Vec<ActionId>,
}

impl ActionQueue {
    pub(crate) fn enqueue(&mut self) -> ActionId {
        let id = ActionId(self.next_id);
        self.next_id += 1;
        self.pending.push_back(id);
        id
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Pops the oldest pending action and marks it handled.
    pub(crate) fn drain_one(&mut self) -> Option<ActionId> {
        let id = self.pending.pop_front()?;
        self.handled.push(id);
        Some(id)
    }

    /// Consumes the handled mark for `id`, if the drainer got to it.
    pub(crate) fn take_handled(&mut self, id: ActionId) -> bool {
        if let Some(i) = self.handled.iter().position(|h| *h == id) {
            self.handled.swap_remove(i);
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drains_in_fifo_order() {
        let mut q = ActionQueue::default();
        let a = q.enqueue();
        let b = q.enqueue();

        assert_eq!(q.drain_one(), Some(a));
        assert!(q.take_handled(a));
        assert!(!q.take_handled(b));

        assert_eq!(q.drain_one(), Some(b));
        assert!(q.take_handled(b));
        assert!(q.is_empty());
    }

    #[test]
    fn handled_mark_is_consumed_once() {
        let mut q = ActionQueue::default();
        let a = q.enqueue();
        assert!(!q.take_handled(a));

        q.drain_one();
        assert!(q.take_handled(a));
        assert!(!q.take_handled(a));
    }

    #[test]
    fn drain_on_empty_queue_is_none() {
        let mut q = ActionQueue::default();
        assert_eq!(q.drain_one(), None);
    }
}
