//! Learning rate schedules.
use drsac_core::error::DrsacError;
use serde::{Deserialize, Serialize};

/// Learning rate as a function of the number of optimization steps done so far.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum LrSchedule {
    /// The base learning rate at every step.
    Constant,

    /// The base learning rate multiplied by `gamma` every `step_size` steps.
    StepDecay {
        /// Multiplicative factor, in `(0, 1]`.
        gamma: f64,

        /// Number of optimization steps between two decays.
        step_size: usize,
    },
}

impl Default for LrSchedule {
    fn default() -> Self {
        Self::Constant
    }
}

impl LrSchedule {
    /// Returns the learning rate after `n_opts` optimization steps.
    pub fn lr(&self, base_lr: f64, n_opts: usize) -> f64 {
        match self {
            Self::Constant => base_lr,
            Self::StepDecay { gamma, step_size } => {
                let n_decays = n_opts / (*step_size).max(1);
                base_lr * gamma.powi(n_decays.min(i32::MAX as usize) as i32)
            }
        }
    }

    /// Checks the parameters of the schedule.
    pub fn check(&self) -> Result<(), DrsacError> {
        match self {
            Self::Constant => Ok(()),
            Self::StepDecay { gamma, step_size } => {
                if !(*gamma > 0.0 && *gamma <= 1.0) {
                    return Err(DrsacError::InvalidConfig(format!(
                        "gamma of the learning rate schedule must be in (0, 1], got {}",
                        gamma
                    )));
                }
                if *step_size == 0 {
                    return Err(DrsacError::InvalidConfig(
                        "step_size of the learning rate schedule must be positive".into(),
                    ));
                }
                Ok(())
            }
        }
    }
}
