//! Resend cooldown for the OTP screen.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Seconds before a new code may be requested.
pub const RESEND_COOLDOWN_SECS: u32 = 60;

const TICK: Duration = Duration::from_secs(1);

/// Seconds remaining until resend is allowed.
///
/// Clones share the same counter.
#[derive(Debug, Clone)]
pub struct ResendCountdown {
    remaining: Arc<watch::Sender<u32>>,
}

impl Default for ResendCountdown {
    fn default() -> Self {
        Self::new()
    }
}

impl ResendCountdown {
    /// Countdown starting at [`RESEND_COOLDOWN_SECS`].
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(RESEND_COOLDOWN_SECS);
        Self {
            remaining: Arc::new(sender),
        }
    }

    /// Seconds left.
    pub fn remaining(&self) -> u32 {
        *self.remaining.borrow()
    }

    /// Whether resend is enabled.
    pub fn can_resend(&self) -> bool {
        self.remaining() == 0
    }

    /// Count one second down, stopping at zero.
    pub fn tick(&self) {
        self.remaining.send_if_modified(|remaining| {
            let before = *remaining;
            *remaining = before.saturating_sub(1);
            before != *remaining
        });
    }

    /// Restart from [`RESEND_COOLDOWN_SECS`].
    pub fn reset(&self) {
        self.remaining.send_replace(RESEND_COOLDOWN_SECS);
    }

    /// Watch the remaining seconds.
    pub fn subscribe(&self) -> watch::Receiver<u32> {
        self.remaining.subscribe()
    }

    /// Tick once per second until `cancel` fires.
    pub fn spawn_ticker(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let countdown = self.clone();
        tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + TICK, TICK);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    () = cancel.cancelled() => {
                        debug!("resend countdown stopped");
                        break;
                    }
                    _ = ticks.tick() => countdown.tick(),
                }
            }
        })
    }
}
