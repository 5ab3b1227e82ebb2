//! Bounded-channel intake executor.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, mpsc};
use std::thread;

use tracing::{debug, error, info};

use orderflow_core::fault::panic_message;

use super::executor::{IntakeError, IntakeShape, IntakeTask, OrderedExecutor};

/// One worker thread fed by a bounded `sync_channel`.
///
/// `execute` blocks while `capacity` tasks are already waiting. Shutdown drops
/// the sender; the worker drains what is queued and exits on disconnect.
#[derive(Debug)]
pub struct ChannelExecutor {
    name: String,
    sender: Mutex<Option<mpsc::SyncSender<IntakeTask>>>,
    join: Mutex<Option<thread::JoinHandle<()>>>,
    closed: AtomicBool,
}

impl ChannelExecutor {
    pub fn spawn(name: impl Into<String>, capacity: usize) -> Result<Self, IntakeError> {
        if capacity == 0 {
            return Err(IntakeError::InvalidCapacity {
                capacity,
                reason: "channel capacity must be at least 1",
            });
        }

        let name = name.into();
        let (tx, rx) = mpsc::sync_channel::<IntakeTask>(capacity);

        let worker_name = name.clone();
        let join = thread::Builder::new()
            .name(name.clone())
            .spawn(move || worker_loop(&worker_name, rx))
            .expect("failed to spawn intake worker thread");

        info!(executor = %name, capacity, "channel intake started");

        Ok(Self {
            name,
            sender: Mutex::new(Some(tx)),
            join: Mutex::new(Some(join)),
            closed: AtomicBool::new(false),
        })
    }
}

impl OrderedExecutor for ChannelExecutor {
    fn shape(&self) -> IntakeShape {
        IntakeShape::Channel
    }

    fn execute(&self, task: IntakeTask) -> Result<(), IntakeError> {
        // Held across a blocking send, so shutdown waits for a producer that
        // is parked on a full channel. The worker never takes this lock.
        let sender = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(tx) = sender.as_ref() else {
            return Err(IntakeError::Closed);
        };
        tx.send(task).map_err(|_| IntakeError::WorkerGone)
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        drop(self.sender.lock().unwrap_or_else(PoisonError::into_inner).take());

        // Held across the join so a concurrent caller also waits for the drain.
        let mut join = self.join.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(j) = join.take() {
            if j.join().is_err() {
                error!(executor = %self.name, "intake worker thread terminated abnormally");
            }
            info!(executor = %self.name, "channel intake stopped");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for ChannelExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn worker_loop(name: &str, rx: mpsc::Receiver<IntakeTask>) {
    let mut processed = 0u64;

    while let Ok(task) = rx.recv() {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(task)) {
            error!(
                worker = name,
                panic = %panic_message(payload.as_ref()),
                "intake task panicked"
            );
        }
        processed += 1;
    }

    debug!(worker = name, processed, "intake channel disconnected");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn runs_tasks_in_submission_order() {
        let exec = ChannelExecutor::spawn("test-intake", 4).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for i in 0..50 {
            let seen = seen.clone();
            exec.execute(Box::new(move || seen.lock().unwrap().push(i)))
                .unwrap();
        }
        exec.shutdown();

        assert_eq!(*seen.lock().unwrap(), (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn concurrent_shutdowns_both_wait_for_the_drain() {
        let exec = ChannelExecutor::spawn("test-intake", 8).unwrap();
        let done = Arc::new(Mutex::new(0));

        for _ in 0..6 {
            let done = done.clone();
            exec.execute(Box::new(move || {
                thread::sleep(std::time::Duration::from_millis(10));
                *done.lock().unwrap() += 1;
            }))
            .unwrap();
        }

        thread::scope(|s| {
            let callers: Vec<_> = (0..2)
                .map(|_| {
                    s.spawn(|| {
                        exec.shutdown();
                        *done.lock().unwrap()
                    })
                })
                .collect();
            for caller in callers {
                assert_eq!(caller.join().unwrap(), 6);
            }
        });
    }

    #[test]
    fn rejects_after_shutdown() {
        let exec = ChannelExecutor::spawn("test-intake", 1).unwrap();
        exec.shutdown();

        assert!(exec.is_closed());
        assert_eq!(exec.execute(Box::new(|| {})).unwrap_err(), IntakeError::Closed);
    }

    #[test]
    fn keeps_running_after_a_task_panics() {
        let exec = ChannelExecutor::spawn("test-intake", 2).unwrap();
        let ran = Arc::new(Mutex::new(false));

        exec.execute(Box::new(|| panic!("bad task"))).unwrap();
        let flag = ran.clone();
        exec.execute(Box::new(move || *flag.lock().unwrap() = true))
            .unwrap();
        exec.shutdown();

        assert!(*ran.lock().unwrap());
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(matches!(
            ChannelExecutor::spawn("test-intake", 0),
            Err(IntakeError::InvalidCapacity { capacity: 0, .. })
        ));
    }
}
