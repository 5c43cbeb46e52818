//! Guard ladder.
//!
//! Four timers armed together when a verification is submitted: two
//! diagnostic checkpoints, a primary timeout and a force-kill. The first
//! three can be cancelled once the vendor answers; the force-kill never is.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::scheduler::{Scheduler, TimerHandle};
use crate::VerificationError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardStage {
    EarlyCheckpoint,
    MidCheckpoint,
    PrimaryTimeout,
    ForceKill,
}

impl GuardStage {
    pub const ALL: [GuardStage; 4] = [
        Self::EarlyCheckpoint,
        Self::MidCheckpoint,
        Self::PrimaryTimeout,
        Self::ForceKill,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::EarlyCheckpoint => "early_checkpoint",
            Self::MidCheckpoint => "mid_checkpoint",
            Self::PrimaryTimeout => "primary_timeout",
            Self::ForceKill => "force_kill",
        }
    }
}

/// Delays of each stage, measured from submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GuardConfig {
    pub early_checkpoint: Duration,
    pub mid_checkpoint: Duration,
    pub primary_timeout: Duration,
    pub force_kill_timeout: Duration,
}

impl GuardConfig {
    /// Native SDK bridge: the vendor UI times out after 15 s on its own.
    pub fn for_native() -> Self {
        Self {
            early_checkpoint: Duration::from_secs(5),
            mid_checkpoint: Duration::from_secs(10),
            primary_timeout: Duration::from_secs(15),
            force_kill_timeout: Duration::from_secs(25),
        }
    }

    /// HTTP polling and hosted pages: leaves room for a 5 minute polling cutoff.
    pub fn for_http() -> Self {
        Self {
            early_checkpoint: Duration::from_secs(30),
            mid_checkpoint: Duration::from_secs(120),
            primary_timeout: Duration::from_secs(300),
            force_kill_timeout: Duration::from_secs(330),
        }
    }

    pub fn delay(&self, stage: GuardStage) -> Duration {
        match stage {
            GuardStage::EarlyCheckpoint => self.early_checkpoint,
            GuardStage::MidCheckpoint => self.mid_checkpoint,
            GuardStage::PrimaryTimeout => self.primary_timeout,
            GuardStage::ForceKill => self.force_kill_timeout,
        }
    }

    /// Stages must be non-zero and strictly increasing.
    pub fn validate(&self) -> Result<(), VerificationError> {
        if self.early_checkpoint.is_zero() {
            return Err(VerificationError::InvalidGuardConfig(
                "early checkpoint must be greater than zero".into(),
            ));
        }
        for pair in GuardStage::ALL.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if self.delay(a) >= self.delay(b) {
                return Err(VerificationError::InvalidGuardConfig(format!(
                    "{} ({:?}) must be shorter than {} ({:?})",
                    a.label(),
                    self.delay(a),
                    b.label(),
                    self.delay(b),
                )));
            }
        }
        Ok(())
    }
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self::for_native()
    }
}

pub type StageCallback = Arc<dyn Fn(GuardStage) + Send + Sync>;

/// Arms guard ladders with a fixed configuration.
#[derive(Clone, Copy, Debug)]
pub struct GuardLadder {
    config: GuardConfig,
}

impl GuardLadder {
    pub fn new(config: GuardConfig) -> Result<Self, VerificationError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Schedule all four stages. `on_stage` runs once per stage that fires.
    pub fn arm(&self, scheduler: &dyn Scheduler, on_stage: StageCallback) -> ArmedLadder {
        let schedule = |stage: GuardStage| {
            let callback = Arc::clone(&on_stage);
            scheduler.schedule(
                stage.label(),
                self.config.delay(stage),
                Box::new(move || callback(stage)),
            )
        };
        ArmedLadder {
            cancellable: [
                GuardStage::EarlyCheckpoint,
                GuardStage::MidCheckpoint,
                GuardStage::PrimaryTimeout,
            ]
            .into_iter()
            .map(&schedule)
            .collect(),
            force_kill: schedule(GuardStage::ForceKill),
        }
    }
}

/// The live timers of one armed ladder.
#[derive(Debug)]
pub struct ArmedLadder {
    cancellable: Vec<TimerHandle>,
    force_kill: TimerHandle,
}

impl ArmedLadder {
    /// Cancel every stage except the force-kill.
    pub fn cancel_pending(&self) {
        for handle in &self.cancellable {
            handle.cancel();
        }
    }

    /// Labels of stages still allowed to fire.
    pub fn live(&self) -> Vec<&'static str> {
        self.cancellable
            .iter()
            .chain(std::iter::once(&self.force_kill))
            .filter(|h| !h.is_cancelled())
            .map(TimerHandle::label)
            .collect()
    }
}
