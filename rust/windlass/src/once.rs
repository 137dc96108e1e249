//! Exactly-once execution under concurrent first access.
//!
//! An [`OnceGuard`] runs an action exactly once no matter how many threads
//! race to be first. The winner runs the action; losers block until it
//! finishes and then return, as do all later callers. Completion is
//! terminal: a guard cannot be reset or rearmed.
//!
//! The guard's lifecycle is `Unstarted -> Running -> Done`, with one escape
//! hatch: if the action unwinds, the guard becomes `Poisoned` and every
//! blocked or future caller panics with a clear message instead of hanging
//! on an initialization that will never complete.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Condvar, Mutex};

/// Lifecycle of a [`OnceGuard`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnceState {
    /// No caller has arrived yet.
    #[default]
    Unstarted,
    /// One caller is running the action; contenders are blocked.
    Running,
    /// The action completed; all calls return immediately.
    Done,
    /// The action unwound; the guard is unusable.
    Poisoned,
}

/// One-shot execution gate, shared by reference across threads.
#[derive(Debug, Default)]
pub struct OnceGuard {
    state: Mutex<OnceState>,
    finished: Condvar,
}

impl OnceGuard {
    pub fn new() -> OnceGuard {
        OnceGuard {
            state: Mutex::new(OnceState::Unstarted),
            finished: Condvar::new(),
        }
    }

    /// Runs `action` if no caller has run it yet; otherwise waits for the
    /// running caller (if any) and returns without invoking `action`.
    ///
    /// On return, the action is guaranteed to have completed, in this
    /// thread or another.
    ///
    /// # Panics
    ///
    /// Panics if the action unwound in any caller, past or present: a
    /// poisoned guard fails fast rather than letting waiters hang.
    pub fn call<F>(&self, action: F)
    where
        F: FnOnce(),
    {
        let mut state = self.state.lock().unwrap();
        loop {
            match *state {
                OnceState::Unstarted => {
                    *state = OnceState::Running;
                    // Run the action without holding the lock so that
                    // contenders park on the condvar, not on the mutex.
                    drop(state);

                    let outcome = panic::catch_unwind(AssertUnwindSafe(action));

                    let mut state = self.state.lock().unwrap();
                    match outcome {
                        Ok(()) => {
                            *state = OnceState::Done;
                            drop(state);
                            self.finished.notify_all();
                            return;
                        }
                        Err(payload) => {
                            *state = OnceState::Poisoned;
                            drop(state);
                            self.finished.notify_all();
                            panic::resume_unwind(payload);
                        }
                    }
                }
                OnceState::Running => {
                    state = self.finished.wait(state).unwrap();
                }
                OnceState::Done => return,
                OnceState::Poisoned => {
                    panic!("OnceGuard action panicked in another caller; the guard is poisoned")
                }
            }
        }
    }

    /// Returns whether the action has completed.
    pub fn is_done(&self) -> bool {
        *self.state.lock().unwrap() == OnceState::Done
    }

    /// Returns the current lifecycle state (stale the moment it is read;
    /// diagnostic only).
    pub fn state(&self) -> OnceState {
        *self.state.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_call_runs_action_once() {
        let guard = OnceGuard::new();
        let runs = AtomicUsize::new(0);

        guard.call(|| {
            runs.fetch_add(1, Ordering::SeqCst);
        });
        guard.call(|| {
            runs.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(guard.is_done());
        assert_eq!(guard.state(), OnceState::Done);
    }

    #[test]
    fn test_racing_callers_observe_completion() {
        const CALLERS: usize = 8;

        let guard = Arc::new(OnceGuard::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..CALLERS {
            let guard = guard.clone();
            let runs = runs.clone();
            handles.push(thread::spawn(move || {
                guard.call(|| {
                    // Long enough that other callers pile up on Running.
                    thread::sleep(Duration::from_millis(30));
                    runs.fetch_add(1, Ordering::SeqCst);
                });
                // Whoever returned, the side effect must have happened.
                assert_eq!(runs.load(Ordering::SeqCst), 1);
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(guard.is_done());
    }

    #[test]
    fn test_unstarted_state_before_any_call() {
        let guard = OnceGuard::new();
        assert_eq!(guard.state(), OnceState::Unstarted);
        assert!(!guard.is_done());
    }

    #[test]
    fn test_panicking_action_poisons_guard() {
        let guard = Arc::new(OnceGuard::new());

        let g = guard.clone();
        let result = thread::spawn(move || {
            g.call(|| panic!("initialization failed"));
        })
        .join();
        assert!(result.is_err());
        assert_eq!(guard.state(), OnceState::Poisoned);

        // Later callers fail fast instead of hanging.
        let g = guard.clone();
        let result = thread::spawn(move || {
            g.call(|| {});
        })
        .join();
        assert!(result.is_err());
    }

    #[test]
    fn test_waiter_blocked_on_poisoned_run_does_not_hang() {
        let guard = Arc::new(OnceGuard::new());

        let g = guard.clone();
        let winner = thread::spawn(move || {
            g.call(|| {
                thread::sleep(Duration::from_millis(50));
                panic!("initialization failed");
            });
        });

        thread::sleep(Duration::from_millis(20));

        // This caller blocks on Running, then must be released by the
        // poisoning, not left waiting forever.
        let g = guard.clone();
        let loser = thread::spawn(move || {
            g.call(|| {});
        });

        assert!(winner.join().is_err());
        assert!(loser.join().is_err());
        assert_eq!(guard.state(), OnceState::Poisoned);
    }
}
