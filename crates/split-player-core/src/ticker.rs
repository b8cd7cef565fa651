//! Update ticker
//!
//! Sends [`PlayerEvent::Tick`] into the player's event channel at a fixed
//! period while the player is playing. At most one tick task runs at a time.
//!
//! Every start begins a new generation. Ticks queued by an earlier run are
//! still in the channel after [`UpdateTicker::stop`]; their generation tells
//! the player to drop them.

use crate::player::PlayerEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct UpdateTicker {
    period: Duration,
    tx: mpsc::UnboundedSender<PlayerEvent>,
    task: Option<JoinHandle<()>>,
    generation: u64,
}

impl UpdateTicker {
    pub fn new(period: Duration, tx: mpsc::UnboundedSender<PlayerEvent>) -> Self {
        Self {
            period,
            tx,
            task: None,
            generation: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    /// Generation of the current (or last) run
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// True if a tick of `generation` comes from the running task
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_running() && generation == self.generation
    }

    /// Start ticking. Returns false if already running.
    ///
    /// Outside a tokio runtime no task can be spawned; the ticker then stays
    /// stopped and updates must be driven by hand.
    pub fn start(&mut self) -> bool {
        if self.task.is_some() {
            return false;
        }

        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("No async runtime, update ticker not started");
                return false;
            }
        };

        self.generation += 1;
        let generation = self.generation;
        let period = self.period;
        let tx = self.tx.clone();
        self.task = Some(handle.spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            loop {
                interval.tick().await;
                if tx.send(PlayerEvent::Tick { generation }).is_err() {
                    break;
                }
            }
        }));

        debug!(period_ms = period.as_millis() as u64, generation, "Update ticker started");
        true
    }

    /// Cancel the tick task. Returns false if it was not running.
    pub fn stop(&mut self) -> bool {
        match self.task.take() {
            Some(task) => {
                task.abort();
                debug!("Update ticker stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for UpdateTicker {
    fn drop(&mut self) {
        self.stop();
    }
}
