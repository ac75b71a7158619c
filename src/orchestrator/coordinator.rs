use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

/// Handle of one in-flight request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    id: u64,
    token: CancellationToken,
    superseded: Arc<AtomicBool>,
}

impl RequestContext {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Canceled because a newer request took the slot.
    pub fn is_superseded(&self) -> bool {
        self.superseded.load(Ordering::SeqCst)
    }
}

/// Single-slot tracker: starting a request cancels the previous one.
#[derive(Debug, Default)]
pub struct RequestCoordinator {
    active: Mutex<Option<RequestContext>>,
    next_id: AtomicU64,
}

impl RequestCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_slot<R>(&self, f: impl FnOnce(&mut Option<RequestContext>) -> R) -> R {
        match self.active.lock() {
            Ok(mut slot) => f(&mut *slot),
            Err(poisoned) => f(&mut *poisoned.into_inner()),
        }
    }

    pub fn start(&self) -> RequestContext {
        let context = RequestContext {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            token: CancellationToken::new(),
            superseded: Arc::new(AtomicBool::new(false)),
        };

        self.with_slot(|slot| {
            if let Some(previous) = slot.replace(context.clone()) {
                previous.superseded.store(true, Ordering::SeqCst);
                previous.token.cancel();
            }
        });
        context
    }

    /// Cancels the active request. Returns false when nothing was in flight.
    pub fn cancel(&self) -> bool {
        match self.with_slot(Option::take) {
            Some(active) => {
                active.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.with_slot(|slot| slot.is_some())
    }

    /// Releases the slot if `context` still owns it.
    pub fn finish(&self, context: &RequestContext) {
        self.with_slot(|slot| {
            if slot.as_ref().is_some_and(|active| active.id == context.id) {
                *slot = None;
            }
        });
    }
}
