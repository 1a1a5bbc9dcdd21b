//! Repeating slideshow timer on a dedicated thread.
//!
//! Ticks are never handled on the timer thread: each one is posted through a
//! [`Dispatcher`] so the UI thread owns every state change.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{RecvTimeoutError, Sender, bounded};
use tracing::{debug, trace, warn};

use crate::events::{Dispatcher, Tick, UiEvent};

pub struct SlideshowTimer {
    generation: u64,
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl SlideshowTimer {
    /// Spawn a timer whose first tick fires after `period`, then every
    /// `period` after the previous one.
    pub fn start(
        period: Duration,
        generation: u64,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = bounded::<()>(0);
        let handle = thread::Builder::new()
            .name(format!("slideshow-timer-{generation}"))
            .spawn(move || {
                let mut seq = 0u64;
                loop {
                    let Some(deadline) = Instant::now().checked_add(period) else {
                        warn!(generation, ?period, "timer period out of range; timer exiting");
                        break;
                    };
                    match stop_rx.recv_deadline(deadline) {
                        Err(RecvTimeoutError::Timeout) => {
                            seq += 1;
                            trace!(generation, seq, "timer tick");
                            if !dispatcher.post(UiEvent::Tick(Tick { generation, seq })) {
                                debug!(generation, "tick receiver gone; timer exiting");
                                break;
                            }
                        }
                        // Stop request or the owner dropped its sender.
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;
        debug!(generation, ?period, "timer started");
        Ok(Self {
            generation,
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Stop the thread and wait for it. No tick is posted after this returns.
    pub fn cancel(&mut self) {
        drop(self.stop_tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(generation = self.generation, "timer thread panicked");
            }
            debug!(generation = self.generation, "timer cancelled");
        }
    }
}

impl Drop for SlideshowTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
