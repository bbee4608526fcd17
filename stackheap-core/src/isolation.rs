//! Execution-Unit Isolation
//!
//! Every measurement runs on a freshly spawned thread with its own stack, so
//! a stack that was already faulted in (or deepened) by one measurement can
//! never hide that cost from the next.
//!
//! Protocol per invocation: create a single-use rendezvous channel, spawn the
//! unit, run the body to completion inside it, send exactly one completion
//! signal, and block the caller on exactly one receive. There is no timeout
//! and no retry. If the unit dies before signalling, its panic is re-raised
//! in the caller.

use crate::measure::pin_to_cpu;
use std::sync::mpsc;
use std::thread;
use thiserror::Error;
use tracing::{debug, warn};

/// Stack size of a spawned Rust thread when none is requested (2 MiB).
pub const DEFAULT_UNIT_STACK_SIZE: usize = 2 * 1024 * 1024;

/// Errors from running a sub-benchmark
#[derive(Debug, Error)]
pub enum RunError {
    /// The execution unit's thread could not be created
    #[error("failed to spawn execution unit `{name}` ({stack_size} byte stack): {source}")]
    Spawn {
        /// Unit name
        name: String,
        /// Requested stack size in bytes
        stack_size: usize,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },
}

/// An isolated, independently scheduled unit of work with a private stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionUnit {
    name: String,
    stack_size: usize,
    pin_cpu: Option<usize>,
}

impl ExecutionUnit {
    /// Describe a unit; nothing is spawned until [`ExecutionUnit::run`].
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stack_size: DEFAULT_UNIT_STACK_SIZE,
            pin_cpu: None,
        }
    }

    /// Stack size of the spawned thread in bytes
    pub fn stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = bytes;
        self
    }

    /// Pin the unit to a CPU before it runs its body
    pub fn pin_to(mut self, cpu: Option<usize>) -> Self {
        self.pin_cpu = cpu;
        self
    }

    /// Unit (thread) name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested stack size in bytes
    pub fn requested_stack_size(&self) -> usize {
        self.stack_size
    }

    /// Spawn the unit, run `body` inside it and wait for its completion signal.
    pub fn run<R, F>(self, body: F) -> Result<R, RunError>
    where
        F: FnOnce() -> R + Send,
        R: Send,
    {
        run_isolated(self, body)
    }
}

/// Run `body` on a fresh execution unit and block until it signals completion.
///
/// The body may borrow from the caller (the unit is a scoped thread). Its
/// return value travels back on the completion signal itself.
pub fn run_isolated<R, F>(unit: ExecutionUnit, body: F) -> Result<R, RunError>
where
    F: FnOnce() -> R + Send,
    R: Send,
{
    let ExecutionUnit {
        name,
        stack_size,
        pin_cpu,
    } = unit;

    // Logged before the unit exists: once it runs, the allocation counters
    // belong to it and the caller must not allocate.
    debug!(unit = %name, stack_size, "execution unit spawning");

    thread::scope(|scope| {
        // Capacity 0: the send completes only when the caller receives.
        let (done_tx, done_rx) = mpsc::sync_channel::<R>(0);

        let handle = thread::Builder::new()
            .name(name.clone())
            .stack_size(stack_size)
            .spawn_scoped(scope, move || {
                if let Some(cpu) = pin_cpu {
                    if let Err(e) = pin_to_cpu(cpu) {
                        warn!(cpu, error = %e, "could not pin execution unit");
                    }
                }
                let output = body();
                // The receiver outlives this send; a failure means the caller is gone.
                let _ = done_tx.send(output);
            })
            .map_err(|source| RunError::Spawn {
                name: name.clone(),
                stack_size,
                source,
            })?;

        match done_rx.recv() {
            Ok(output) => {
                // Signal received; the unit only has to return from its closure.
                if let Err(payload) = handle.join() {
                    std::panic::resume_unwind(payload);
                }
                debug!(unit = %name, "execution unit completed");
                Ok(output)
            }
            // Sender dropped without a signal: the unit panicked.
            Err(mpsc::RecvError) => match handle.join() {
                Err(payload) => std::panic::resume_unwind(payload),
                Ok(()) => unreachable!("execution unit exited without signalling"),
            },
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runs_on_a_different_thread() {
        let caller = thread::current().id();
        let unit_id = ExecutionUnit::new("unit-test")
            .run(|| thread::current().id())
            .unwrap();
        assert_ne!(caller, unit_id);
    }

    #[test]
    fn test_every_invocation_gets_a_fresh_unit() {
        let ids: Vec<_> = (0..20)
            .map(|_| {
                ExecutionUnit::new("fresh")
                    .run(|| thread::current().id())
                    .unwrap()
            })
            .collect();

        let unique: std::collections::HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), ids.len());
    }

    #[test]
    fn test_unit_carries_its_name() {
        let name = ExecutionUnit::new("small/stack")
            .run(|| thread::current().name().map(str::to_owned))
            .unwrap();
        assert_eq!(name.as_deref(), Some("small/stack"));
    }

    #[test]
    fn test_body_can_borrow_mutably() {
        let mut counter = 0u32;
        run_isolated(ExecutionUnit::new("borrow"), || counter += 5).unwrap();
        assert_eq!(counter, 5);
    }

    #[test]
    fn test_large_stack_frame_fits_requested_stack() {
        let unit = ExecutionUnit::new("big-frame").stack_size(8 * 1024 * 1024);
        let first = unit
            .run(|| {
                let buf = std::hint::black_box([7u8; 1024 * 1024]);
                buf[0]
            })
            .unwrap();
        assert_eq!(first, 7);
    }

    #[test]
    fn test_panic_is_reraised_in_caller() {
        let result = std::panic::catch_unwind(|| {
            run_isolated(ExecutionUnit::new("crashes"), || -> u8 {
                panic!("boom inside unit")
            })
        });

        let payload = result.unwrap_err();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_default();
        assert!(message.contains("boom inside unit"));
    }

    #[test]
    fn test_caller_logs_nothing_while_unit_runs() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::{Arc, Mutex};
        use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

        static UNIT_RUNNING: AtomicBool = AtomicBool::new(false);

        // Records, for every caller-side event, whether the unit body was live
        struct Recorder(Arc<Mutex<Vec<bool>>>);

        impl<S: tracing::Subscriber> Layer<S> for Recorder {
            fn on_event(&self, _event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
                self.0.lock().unwrap().push(UNIT_RUNNING.load(Ordering::SeqCst));
            }
        }

        let seen = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(Recorder(seen.clone()));

        tracing::subscriber::with_default(subscriber, || {
            ExecutionUnit::new("quiet-caller")
                .run(|| {
                    UNIT_RUNNING.store(true, Ordering::SeqCst);
                    std::thread::sleep(std::time::Duration::from_millis(20));
                    UNIT_RUNNING.store(false, Ordering::SeqCst);
                })
                .unwrap();
        });

        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        assert!(seen.iter().all(|&running| !running));
    }

    #[test]
    fn test_builder_fields() {
        let unit = ExecutionUnit::new("cfg").stack_size(4096 * 16).pin_to(Some(1));
        assert_eq!(unit.name(), "cfg");
        assert_eq!(unit.requested_stack_size(), 4096 * 16);
    }
}
