use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Single-slot gate over the inference engine.
///
/// At most one generation holds the slot. Callers that fail to acquire it
/// are expected to reject immediately; there is no queue.
#[derive(Debug, Default)]
pub struct AdmissionGuard {
    busy: AtomicBool,
}

impl AdmissionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the slot. Returns false when a generation is already active.
    ///
    /// A successful call must be paired with exactly one [`release`].
    ///
    /// [`release`]: AdmissionGuard::release
    pub fn try_acquire(&self) -> bool {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Free the slot. Releasing an already free slot leaves it free.
    pub fn release(&self) {
        self.busy.store(false, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Take the slot as a permit that frees it when dropped.
    pub fn try_permit(self: &Arc<Self>) -> Option<AdmissionPermit> {
        if self.try_acquire() {
            Some(AdmissionPermit {
                guard: Arc::clone(self),
            })
        } else {
            None
        }
    }
}

/// Ownership of the admission slot.
///
/// Dropping the permit releases the slot exactly once, whether the
/// generation completed, failed, or its response stream was abandoned.
#[derive(Debug)]
#[must_use = "dropping the permit releases the admission slot"]
pub struct AdmissionPermit {
    guard: Arc<AdmissionGuard>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.guard.release();
        log::debug!("Admission slot released");
    }
}
