//! Deferred body teardown
//!
//! Contact handlers run while the world is mid-frame and must not remove
//! bodies. They enqueue them here instead; the frame loop drains the queue
//! before it spawns anything or steps the world again.
//!
//! Invariant: a handle is queued at most once, and a drained handle is gone
//! from the world.

use std::collections::HashSet;

use super::physics::BodyHandle;

/// Something that can remove bodies for real
pub trait BodyTeardown {
    /// Remove the body; returns false if it was already gone
    fn destroy_body(&mut self, handle: BodyHandle) -> bool;
}

/// Set-backed queue of bodies awaiting destruction
#[derive(Debug, Default)]
pub struct DestructionQueue {
    /// Drain order (insertion order)
    pending: Vec<BodyHandle>,
    queued: HashSet<BodyHandle>,
}

impl DestructionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a body. Returns false (and does nothing) if it is already queued.
    pub fn enqueue(&mut self, handle: BodyHandle) -> bool {
        if !self.queued.insert(handle) {
            return false;
        }
        self.pending.push(handle);
        true
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.queued.contains(&handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Destroy every queued body and empty the queue. Returns the number of
    /// bodies actually removed.
    pub fn drain(&mut self, world: &mut impl BodyTeardown) -> usize {
        let mut destroyed = 0;
        for handle in self.pending.drain(..) {
            if world.destroy_body(handle) {
                destroyed += 1;
            } else {
                log::warn!("Queued body {:?} was already gone", handle.raw_parts());
            }
        }
        self.queued.clear();
        if destroyed > 0 {
            log::debug!("Destroyed {} queued bodies", destroyed);
        }
        destroyed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct CountingWorld {
        calls: HashMap<BodyHandle, u32>,
    }

    impl BodyTeardown for CountingWorld {
        fn destroy_body(&mut self, handle: BodyHandle) -> bool {
            *self.calls.entry(handle).or_default() += 1;
            true
        }
    }

    #[test]
    fn test_double_enqueue_destroys_once() {
        let mut queue = DestructionQueue::new();
        let mut world = CountingWorld::default();
        let body = BodyHandle::from_raw_parts(3, 0);

        assert!(queue.enqueue(body));
        assert!(!queue.enqueue(body));
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.drain(&mut world), 1);
        assert_eq!(world.calls[&body], 1);
        assert!(queue.is_empty());
        assert!(!queue.contains(body));
    }

    #[test]
    fn test_drain_keeps_insertion_order() {
        struct Recorder(Vec<BodyHandle>);
        impl BodyTeardown for Recorder {
            fn destroy_body(&mut self, handle: BodyHandle) -> bool {
                self.0.push(handle);
                true
            }
        }

        let mut queue = DestructionQueue::new();
        let handles: Vec<_> = [5, 1, 9].iter().map(|&i| BodyHandle::from_raw_parts(i, 0)).collect();
        for h in &handles {
            queue.enqueue(*h);
        }
        let mut recorder = Recorder(Vec::new());
        queue.drain(&mut recorder);
        assert_eq!(recorder.0, handles);
    }

    #[test]
    fn test_requeue_after_drain() {
        let mut queue = DestructionQueue::new();
        let mut world = CountingWorld::default();
        let body = BodyHandle::from_raw_parts(0, 0);

        queue.enqueue(body);
        queue.drain(&mut world);
        // A drained handle may be queued again; the world decides if it still exists
        assert!(queue.enqueue(body));
    }
}
