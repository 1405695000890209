/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 19/10/26
******************************************************************************/

use crate::utils::TransportError;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, ThreadId};
use tracing::{debug, trace, warn};

/// Manual-reset event fired when the task body returns or unwinds.
#[derive(Debug, Default)]
struct Completion {
    fired: Mutex<bool>,
    cond: Condvar,
}

impl Completion {
    fn reset(&self) {
        *self.fired.lock() = false;
    }

    fn set(&self) {
        let mut fired = self.fired.lock();
        *fired = true;
        self.cond.notify_all();
    }

    fn is_set(&self) -> bool {
        *self.fired.lock()
    }

    fn wait(&self) {
        let mut fired = self.fired.lock();
        while !*fired {
            self.cond.wait(&mut fired);
        }
    }
}

#[derive(Debug)]
struct ActivityState {
    stopped: AtomicBool,
    running: AtomicBool,
    disposed: AtomicBool,
    done: Completion,
    worker: Mutex<Option<ThreadId>>,
}

/// Fires the completion event when dropped, so a panicking body still releases `wait()`
/// before the panic reaches the thread's top level.
struct CompletionGuard(Arc<ActivityState>);

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        if thread::panicking() {
            warn!("Activity body panicked");
        }
        self.0.done.set();
    }
}

/// Cooperative stop flag handed to the task body.
#[derive(Debug, Clone)]
pub struct StopToken {
    state: Arc<ActivityState>,
}

impl StopToken {
    /// Returns true if the activity has been requested to stop.
    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::SeqCst)
    }
}

/// A background task with an explicit start / stop / wait lifecycle.
///
/// `start()` launches the body on a dedicated, named thread; `stop()` only raises a flag
/// the body is expected to poll through its [`StopToken`]; `wait()` blocks until the body
/// has returned (normally or by panicking). Dropping an `Activity` stops and waits for it.
#[derive(Debug)]
pub struct Activity {
    state: Arc<ActivityState>,
    start_lock: Mutex<()>,
}

impl Default for Activity {
    fn default() -> Self {
        Self::new()
    }
}

impl Activity {
    /// Creates an activity that is not running.
    pub fn new() -> Self {
        Self {
            state: Arc::new(ActivityState {
                stopped: AtomicBool::new(true),
                running: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
                done: Completion::default(),
                worker: Mutex::new(None),
            }),
            start_lock: Mutex::new(()),
        }
    }

    /// Starts the activity on a new thread called `name`.
    ///
    /// Returns `Ok(false)` without doing anything when the activity is already running or
    /// has been disposed, `Ok(true)` when the body has been launched.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Spawn` if the operating system refuses to create the thread.
    pub fn start<F>(&self, name: &str, body: F) -> Result<bool, TransportError>
    where
        F: FnOnce(StopToken) + Send + 'static,
    {
        let _lock = self.start_lock.lock();

        if self.is_disposed() {
            return Ok(false);
        }
        if self.is_running() {
            debug!("Activity {} already running", name);
            return Ok(false);
        }

        self.state.done.reset();
        self.state.stopped.store(false, Ordering::SeqCst);
        self.state.running.store(true, Ordering::SeqCst);

        let state = self.state.clone();
        let token = StopToken {
            state: self.state.clone(),
        };
        let spawned = thread::Builder::new().name(name.to_string()).spawn(move || {
            *state.worker.lock() = Some(thread::current().id());
            let _guard = CompletionGuard(state);
            body(token);
        });

        match spawned {
            Ok(_) => {
                trace!("Activity {} launched", name);
                Ok(true)
            }
            Err(e) => {
                self.state.running.store(false, Ordering::SeqCst);
                Err(TransportError::Spawn(e.to_string()))
            }
        }
    }

    /// Requests to stop the activity. Never blocks and never interrupts I/O in progress.
    pub fn stop(&self) {
        self.state.stopped.store(true, Ordering::SeqCst);
    }

    /// Waits for the activity to complete, then marks it as not running.
    ///
    /// Returns immediately when the activity is not running. When invoked from the
    /// activity's own thread (e.g. from a listener callback) it does not block, since the
    /// body cannot complete while it is waiting on itself.
    pub fn wait(&self) {
        if !self.state.running.load(Ordering::SeqCst) {
            return;
        }
        if *self.state.worker.lock() == Some(thread::current().id()) {
            debug!("wait() called from the activity thread, not blocking");
            return;
        }
        self.state.done.wait();
        self.state.running.store(false, Ordering::SeqCst);
    }

    /// Returns true if the activity has been requested to stop.
    pub fn is_stopped(&self) -> bool {
        self.state.stopped.load(Ordering::SeqCst)
    }

    /// Returns true between a successful `start()` and the completion of the body.
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst) && !self.state.done.is_set()
    }

    /// Marks the activity as permanently disposed: later `start()` calls are no-ops.
    ///
    /// Returns true only for the first call. Serialized with `start()`, so once this
    /// returns no new body can be launched.
    pub fn dispose(&self) -> bool {
        let _lock = self.start_lock.lock();
        !self.state.disposed.swap(true, Ordering::SeqCst)
    }

    /// Returns true once `dispose()` has been called.
    pub fn is_disposed(&self) -> bool {
        self.state.disposed.load(Ordering::SeqCst)
    }

    /// A token observing this activity's stop flag.
    pub fn stop_token(&self) -> StopToken {
        StopToken {
            state: self.state.clone(),
        }
    }
}

impl Drop for Activity {
    fn drop(&mut self) {
        self.stop();
        self.wait();
    }
}
