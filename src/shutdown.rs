//! Session teardown.
//!
//! [`ShutdownCoordinator::shutdown`] may be called from the main thread or from
//! either dispatcher thread, any number of times. The first call runs the
//! sequence below; every later call returns immediately.
//!
//! 1. clear `running` (phase becomes `ShuttingDown`)
//! 2. wait for both dispatcher threads, bounded by one shared deadline
//! 3. close the transport
//! 4. tell the renderer to release its resources
//! 5. run the exit hook
//!
//! A dispatcher stuck in a receive past the deadline is detached, not
//! interrupted. The calling thread never waits on itself.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::dispatch::DispatchExit;
use crate::state::Session;
use crate::transport::Transport;

/// Poll interval while waiting for dispatchers.
const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Last step of teardown, typically ends the process.
pub type ExitHook = Box<dyn Fn() + Send + Sync>;

/// Owns dispatcher handles and the teardown sequence.
pub struct ShutdownCoordinator {
    session: Arc<Session>,
    transport: Arc<dyn Transport>,
    workers: Mutex<Vec<JoinHandle<DispatchExit>>>,
    join_timeout: Duration,
    torn_down: AtomicBool,
    exit_hook: Option<ExitHook>,
}

impl ShutdownCoordinator {
    pub fn new(
        session: Arc<Session>,
        transport: Arc<dyn Transport>,
        join_timeout: Duration,
    ) -> Self {
        Self {
            session,
            transport,
            workers: Mutex::new(Vec::new()),
            join_timeout,
            torn_down: AtomicBool::new(false),
            exit_hook: None,
        }
    }

    pub fn with_exit_hook(mut self, hook: ExitHook) -> Self {
        self.exit_hook = Some(hook);
        self
    }

    /// Hand over a dispatcher thread. After teardown the handle is simply detached.
    pub fn register(&self, handle: JoinHandle<DispatchExit>) {
        let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
        if self.is_shut_down() {
            debug!("teardown already ran; detaching late dispatcher");
            return;
        }
        workers.push(handle);
    }

    pub fn is_shut_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Tear the session down.
    ///
    /// Returns `true` if this call ran the teardown, `false` if an earlier one did.
    pub fn shutdown(&self) -> bool {
        let workers = {
            let mut workers = self.workers.lock().unwrap_or_else(PoisonError::into_inner);
            if self.torn_down.swap(true, Ordering::AcqRel) {
                return false;
            }
            std::mem::take(&mut *workers)
        };

        info!("shutting down");
        self.session.request_stop();
        self.join_workers(workers);
        self.transport.close();
        self.session.renderer().with(|r| r.shutdown());
        info!("client shutdown complete");

        if let Some(hook) = &self.exit_hook {
            hook();
        }
        true
    }

    fn join_workers(&self, workers: Vec<JoinHandle<DispatchExit>>) {
        let me = thread::current().id();
        let deadline = Instant::now() + self.join_timeout;

        for handle in workers {
            let name = handle.thread().name().unwrap_or("dispatcher").to_string();
            if handle.thread().id() == me {
                // Teardown was started by this dispatcher; it exits when we return.
                continue;
            }
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(JOIN_POLL_INTERVAL);
            }
            if !handle.is_finished() {
                warn!(thread = %name, "dispatcher still blocked; abandoning it");
                continue;
            }
            match handle.join() {
                Ok(exit) => debug!(thread = %name, ?exit, "dispatcher joined"),
                Err(_) => warn!(thread = %name, "dispatcher panicked"),
            }
        }
    }
}

impl std::fmt::Debug for ShutdownCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShutdownCoordinator")
            .field("join_timeout", &self.join_timeout)
            .field("torn_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}
