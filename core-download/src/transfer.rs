//! # Transfers
//!
//! A [`TransferSource`] opens one [`Transfer`] per activation. The manager
//! pulls updates until the transfer finishes, fails, or the manager cancels
//! it. Resumption is expressed as a fraction already transferred.
//!
//! [`SimulatedTransferSource`] advances a fixed step on every tick and is the
//! default source.

use std::time::Duration;

use async_trait::async_trait;
use core_library::Track;
use core_runtime::config::DownloadSettings;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub track: Track,
    /// Fraction already transferred by an earlier attempt
    pub resume_from: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TransferUpdate {
    /// Cumulative amount received; `received >= total` completes the item.
    Received { received: u64, total: u64 },
    /// Transfer finished and the content is available at `local_uri`.
    Finished { local_uri: String },
    Failed { message: String },
}

#[async_trait]
pub trait Transfer: Send {
    /// Next update, or `None` when the transfer has nothing more to report.
    async fn next(&mut self) -> Option<TransferUpdate>;

    /// Abort the transfer. The manager never polls it afterwards.
    async fn cancel(&mut self) {}
}

#[async_trait]
pub trait TransferSource: Send + Sync {
    /// Opening fails when the track has nothing to transfer.
    async fn open(&self, request: TransferRequest) -> Result<Box<dyn Transfer>>;
}

/// Fixed-cadence progress simulation.
#[derive(Debug, Clone)]
pub struct SimulatedTransferSource {
    tick_interval: Duration,
    steps: u32,
}

impl SimulatedTransferSource {
    pub fn new(tick_interval: Duration, steps: u32) -> Self {
        Self {
            tick_interval,
            steps: steps.max(1),
        }
    }

    pub fn from_settings(settings: &DownloadSettings) -> Self {
        Self::new(settings.tick_interval(), settings.steps_to_complete)
    }
}

impl Default for SimulatedTransferSource {
    fn default() -> Self {
        Self::from_settings(&DownloadSettings::default())
    }
}

#[async_trait]
impl TransferSource for SimulatedTransferSource {
    async fn open(&self, request: TransferRequest) -> Result<Box<dyn Transfer>> {
        request.track.require_remote_uri()?;

        let resume = request.resume_from.clamp(0.0, 1.0);
        let step = ((resume * self.steps as f64).round() as u32).min(self.steps);

        let mut ticks = interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Ok(Box::new(SimulatedTransfer {
            ticks,
            step,
            steps: self.steps,
            done: false,
        }))
    }
}

struct SimulatedTransfer {
    ticks: Interval,
    step: u32,
    steps: u32,
    done: bool,
}

#[async_trait]
impl Transfer for SimulatedTransfer {
    async fn next(&mut self) -> Option<TransferUpdate> {
        if self.done {
            return None;
        }
        self.ticks.tick().await;
        self.step = (self.step + 1).min(self.steps);
        self.done = self.step == self.steps;

        Some(TransferUpdate::Received {
            received: self.step as u64,
            total: self.steps as u64,
        })
    }

    async fn cancel(&mut self) {
        self.done = true;
    }
}
