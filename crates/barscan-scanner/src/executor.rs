//! Marshalling callbacks onto the control thread.
//!
//! Listeners are assumed to be bound to one thread, typically a UI loop. The
//! orchestrator never calls them directly from its worker or binder threads;
//! it hands closures to a [`ControlExecutor`] instead. [`ControlLoop`] is a
//! ready-made executor for hosts without an event loop of their own: the
//! owning thread drains it with one of the `pump` methods.

use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use log::debug;

pub type Task = Box<dyn FnOnce() + Send + 'static>;

pub trait ControlExecutor: Send + Sync {
    /// Schedule `task` to run on the control thread. Must not run it inline.
    fn execute(&self, task: Task);
}

/// Task queue drained by the thread that owns it.
pub struct ControlLoop {
    tx: Sender<Task>,
    rx: Receiver<Task>,
}

impl Default for ControlLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlLoop {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self { tx, rx }
    }

    /// Executor handle that feeds this loop.
    pub fn handle(&self) -> ControlHandle {
        ControlHandle {
            tx: self.tx.clone(),
        }
    }

    /// Run every queued task, including ones queued while pumping.
    pub fn pump(&self) -> usize {
        let mut ran = 0;
        while let Ok(task) = self.rx.try_recv() {
            task();
            ran += 1;
        }
        ran
    }

    /// Wait up to `timeout` for a task, then drain the queue.
    pub fn pump_timeout(&self, timeout: Duration) -> usize {
        match self.rx.recv_timeout(timeout) {
            Ok(task) => {
                task();
                1 + self.pump()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => 0,
        }
    }

    /// Pump until `done` holds or `timeout` elapses. Returns the final `done()`.
    pub fn run_until(&self, timeout: Duration, mut done: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            self.pump();
            if done() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            self.pump_timeout((deadline - now).min(Duration::from_millis(10)));
        }
    }
}

#[derive(Clone, Debug)]
pub struct ControlHandle {
    tx: Sender<Task>,
}

impl ControlExecutor for ControlHandle {
    fn execute(&self, task: Task) {
        if self.tx.send(task).is_err() {
            debug!("control loop dropped; discarding task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn tasks_run_in_post_order_on_pumping_thread() {
        let control = ControlLoop::new();
        let handle = control.handle();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let me = thread::current().id();

        let poster = {
            let order = order.clone();
            thread::spawn(move || {
                for i in 0..5 {
                    let order = order.clone();
                    handle.execute(Box::new(move || {
                        assert_eq!(thread::current().id(), me);
                        order.lock().push(i);
                    }));
                }
            })
        };
        poster.join().unwrap();

        assert_eq!(control.pump(), 5);
        assert_eq!(*order.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn run_until_times_out() {
        let control = ControlLoop::new();
        assert!(!control.run_until(Duration::from_millis(20), || false));
    }

    #[test]
    fn run_until_sees_late_task() {
        let control = ControlLoop::new();
        let handle = control.handle();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let t = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            handle.execute(Box::new(move || {
                h.fetch_add(1, Ordering::SeqCst);
            }));
        });
        let done = control.run_until(Duration::from_secs(5), || hits.load(Ordering::SeqCst) == 1);
        assert!(done);
        t.join().unwrap();
    }
}
