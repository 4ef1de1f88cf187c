//! Interface of learned reward models.
use anyhow::Result;
use candle_core::Tensor;
use std::path::{Path, PathBuf};

/// A model of the reward distribution given an observation and an action.
///
/// Observations and actions are batches of shape `(batch_size, dim)`.
pub trait RewardModel {
    /// Returns the expected reward, of shape `(batch_size,)`.
    fn predict(&self, obs: &Tensor, act: &Tensor) -> Result<Tensor>;

    /// Does a gradient step on the regression loss against the observed rewards
    /// of shape `(batch_size,)`, and returns the loss.
    fn fit(&mut self, obs: &Tensor, act: &Tensor, reward: &Tensor) -> Result<f32>;

    /// Returns `n` reward samples per transition, of shape `(batch_size, n)`,
    /// without gradient.
    fn sample(&mut self, obs: &Tensor, act: &Tensor, n: usize) -> Result<Tensor>;

    /// Save the parameters to prefix + ".pt".
    fn save(&self, prefix: &Path) -> Result<PathBuf>;

    /// Load the parameters from prefix + ".pt".
    fn load(&mut self, prefix: &Path) -> Result<()>;
}
