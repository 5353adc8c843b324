//! Session lifetime: liveness flag and scoped input listener registration

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flag telling deferred work whether its session still exists
///
/// Pending work (source decode, blur extraction) holds a clone and checks it
/// before touching the scene.
#[derive(Clone, Debug)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Mark the session as torn down; irreversible
    pub fn kill(&self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// Kinds of host-level input listeners the editor needs while running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerKind {
    Keyboard,
    Pointer,
    Resize,
}

/// Opaque handle returned by the host when a listener is registered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerHandle(pub u64);

/// Host-side registry of global listeners
pub trait ListenerRegistry {
    fn register(&self, kind: ListenerKind) -> ListenerHandle;
    fn unregister(&self, handle: ListenerHandle);
}

/// Registered listeners, removed again when the guard is dropped
#[must_use = "listeners are unregistered as soon as the guard is dropped"]
pub struct ListenerGuard<'a> {
    registry: &'a dyn ListenerRegistry,
    handles: Vec<ListenerHandle>,
}

impl<'a> ListenerGuard<'a> {
    /// Register one listener of each kind
    pub fn acquire(registry: &'a dyn ListenerRegistry, kinds: &[ListenerKind]) -> Self {
        let handles = kinds.iter().map(|kind| registry.register(*kind)).collect();
        Self { registry, handles }
    }

    pub fn handles(&self) -> &[ListenerHandle] {
        &self.handles
    }
}

impl Drop for ListenerGuard<'_> {
    fn drop(&mut self) {
        for handle in self.handles.drain(..) {
            self.registry.unregister(handle);
        }
        log::debug!("Input listeners released");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Registry that records live handles
    #[derive(Default)]
    pub(crate) struct FakeRegistry {
        pub next: RefCell<u64>,
        pub live: RefCell<Vec<(ListenerHandle, ListenerKind)>>,
    }

    impl ListenerRegistry for FakeRegistry {
        fn register(&self, kind: ListenerKind) -> ListenerHandle {
            let mut next = self.next.borrow_mut();
            *next += 1;
            let handle = ListenerHandle(*next);
            self.live.borrow_mut().push((handle, kind));
            handle
        }

        fn unregister(&self, handle: ListenerHandle) {
            self.live.borrow_mut().retain(|(h, _)| *h != handle);
        }
    }

    #[test]
    fn test_liveness_is_shared() {
        let a = Liveness::new();
        let b = a.clone();
        assert!(b.is_alive());
        a.kill();
        assert!(!b.is_alive());
    }

    #[test]
    fn test_guard_unregisters_on_drop() {
        let registry = FakeRegistry::default();
        {
            let guard = ListenerGuard::acquire(
                &registry,
                &[ListenerKind::Keyboard, ListenerKind::Pointer],
            );
            assert_eq!(guard.handles().len(), 2);
            assert_eq!(registry.live.borrow().len(), 2);
        }
        assert!(registry.live.borrow().is_empty());
    }
}
