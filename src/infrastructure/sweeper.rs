//! Background reclamation of stale fingerprints.
//!
//! A dedicated thread wakes on a fixed ticker and sweeps the store. The only
//! other wakeup source is the stop signal: a channel whose sender is dropped
//! to disconnect it, which can happen at most once.

use crate::application::dedupe::{DedupeFilter, SweepSchedule};
use crate::application::ports::ExpiryStore;
use crate::infrastructure::deduper::ShutdownError;
use crossbeam::channel::{self, select, Receiver, Sender};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, trace};

const THREAD_NAME: &str = "kvlog-dedupe-sweeper";

/// Handle to a running sweeper thread.
#[derive(Debug)]
pub(crate) struct Sweeper {
    stop_tx: Mutex<Option<Sender<()>>>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Sweeper {
    /// Spawn the sweeper thread for `filter`'s store.
    pub(crate) fn spawn<S>(filter: DedupeFilter<S>, schedule: SweepSchedule) -> io::Result<Self>
    where
        S: ExpiryStore + Clone + 'static,
    {
        let (stop_tx, stop_rx) = channel::bounded::<()>(0);
        let handle = thread::Builder::new()
            .name(THREAD_NAME.into())
            .spawn(move || run(filter, schedule, stop_rx))?;

        Ok(Self {
            stop_tx: Mutex::new(Some(stop_tx)),
            handle: Mutex::new(Some(handle)),
        })
    }

    /// Signal the thread to exit without waiting for it.
    ///
    /// # Returns
    /// `true` for the call that actually delivered the signal, `false` after
    pub(crate) fn stop(&self) -> bool {
        // Dropping the sender disconnects the channel and wakes the thread.
        lock(&self.stop_tx).take().is_some()
    }

    /// Check if the stop signal has been sent.
    pub(crate) fn is_stopped(&self) -> bool {
        lock(&self.stop_tx).is_none()
    }

    /// Signal the thread and wait for it to exit.
    pub(crate) fn join(&self) -> Result<(), ShutdownError> {
        self.stop();
        let handle = lock(&self.handle).take();
        match handle {
            Some(handle) => handle.join().map_err(|_| ShutdownError::SweeperPanicked),
            None => Ok(()),
        }
    }
}

fn run<S>(filter: DedupeFilter<S>, schedule: SweepSchedule, stop_rx: Receiver<()>)
where
    S: ExpiryStore,
{
    let ticker = channel::tick(schedule.interval);
    trace!(
        interval_ms = schedule.interval.as_millis() as u64,
        expire_after_ms = schedule.expire_after.as_millis() as u64,
        "fingerprint sweeper started"
    );

    loop {
        select! {
            recv(ticker) -> _ => {
                let evicted = filter.sweep(schedule.expire_after);
                if evicted > 0 {
                    debug!(
                        evicted,
                        remaining = filter.store().len(),
                        "swept stale fingerprints"
                    );
                }
            }
            recv(stop_rx) -> _ => break,
        }
    }

    trace!("fingerprint sweeper stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
