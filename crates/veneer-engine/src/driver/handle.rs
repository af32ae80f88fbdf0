use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use slotmap::Key;

use super::AnyResource;

/// Ids released by dropped [`Owned`] handles, waiting for the backend.
///
/// Cloning shares the queue. The backend drains it at frame boundaries and
/// destroys each id once.
#[derive(Clone, Default)]
pub struct ReleaseQueue {
    pending: Rc<RefCell<Vec<AnyResource>>>,
}

impl ReleaseQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, id: AnyResource) {
        self.pending.borrow_mut().push(id);
    }

    pub fn drain(&self) -> Vec<AnyResource> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }

    pub fn len(&self) -> usize {
        self.pending.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.borrow().is_empty()
    }
}

impl fmt::Debug for ReleaseQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseQueue").field("pending", &self.len()).finish()
    }
}

/// Scoped ownership of a driver resource.
///
/// Dropping the handle queues the id for release; it is never destroyed
/// twice through the handle.
pub struct Owned<K: Key + Into<AnyResource>> {
    id: K,
    queue: Option<ReleaseQueue>,
}

impl<K: Key + Into<AnyResource>> Owned<K> {
    pub fn new(id: K, queue: ReleaseQueue) -> Self {
        Self { id, queue: Some(queue) }
    }

    #[inline]
    pub fn id(&self) -> K {
        self.id
    }

    /// `true` when the wrapped id is the null id (allocation failed).
    #[inline]
    pub fn is_null(&self) -> bool {
        self.id.is_null()
    }

    /// Gives up ownership without releasing; the caller destroys the id.
    pub fn into_raw(mut self) -> K {
        self.queue = None;
        self.id
    }
}

impl<K: Key + Into<AnyResource>> Drop for Owned<K> {
    fn drop(&mut self) {
        if let Some(queue) = self.queue.take() {
            if !self.id.is_null() {
                queue.push(self.id.into());
            }
        }
    }
}

impl<K: Key + Into<AnyResource>> fmt::Debug for Owned<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Owned").field(&self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;
    use crate::driver::TextureId;

    #[test]
    fn drop_queues_id_once() {
        let queue = ReleaseQueue::new();
        let id = SlotMap::<TextureId, ()>::with_key().insert(());
        {
            let owned = Owned::new(id, queue.clone());
            assert_eq!(owned.id(), id);
        }
        assert_eq!(queue.drain(), vec![AnyResource::Texture(id)]);
        assert!(queue.is_empty());
    }

    #[test]
    fn null_and_raw_handles_queue_nothing() {
        let queue = ReleaseQueue::new();
        drop(Owned::new(TextureId::null(), queue.clone()));

        let id = SlotMap::<TextureId, ()>::with_key().insert(());
        let raw = Owned::new(id, queue.clone()).into_raw();
        assert_eq!(raw, id);
        assert!(queue.is_empty());
    }
}
