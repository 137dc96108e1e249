//! Cooperative cancellation.
//!
//! A [`CancelToken`] is a clonable flag shared between the party requesting
//! cancellation and the code observing it. Cancellation is always
//! cooperative: setting the flag never interrupts anything by itself, it
//! only becomes visible at the points where running code checks the token
//! (workers check between tasks, never mid-task).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cancellation flag shared between a controller and any number of
/// observers.
///
/// All clones refer to the same flag. Once set, the flag stays set for the
/// lifetime of the token; there is no way to rearm it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Sets the cancellation flag.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Checks whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
