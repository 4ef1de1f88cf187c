//! Distributionally robust reward backup.
//!
//! A reward model is fitted on the observed rewards, rewards are sampled from
//! it, and the worst-case mean over a KL ball around the samples replaces the
//! observed reward in the Bellman target.
mod categorical;
mod config;
mod dual;
mod gaussian;
mod reward_model;
use anyhow::Result;
pub use categorical::CategoricalRewardModel;
use candle_core::{Device, Tensor};
pub use config::{RewardModelConfig, RobustConfig};
use drsac_core::record::{Record, RecordValue};
pub use dual::{dual_objective, uncertainty_radius, DualOptimizer};
pub use gaussian::GaussianRewardModel;
use log::info;
pub use reward_model::RewardModel;
use std::path::{Path, PathBuf};

fn pt_path(prefix: &Path) -> PathBuf {
    let mut path = PathBuf::from(prefix);
    path.set_extension("pt");
    path
}

impl RewardModelConfig {
    /// Builds the reward model for inputs of dimension `in_dim`.
    pub fn build(&self, in_dim: usize, device: &Device, seed: u64) -> Result<Box<dyn RewardModel>> {
        self.check()?;
        match self {
            Self::Gaussian { units, opt_config } => Ok(Box::new(GaussianRewardModel::build(
                in_dim,
                units.clone(),
                opt_config,
                device.clone(),
                seed,
            )?)),
            Self::Categorical {
                units,
                values,
                opt_config,
            } => Ok(Box::new(CategoricalRewardModel::build(
                in_dim,
                units.clone(),
                values.clone(),
                opt_config,
                device.clone(),
                seed,
            )?)),
        }
    }
}

/// Reward model and dual optimizer used in the robust mode.
pub struct RobustBackup {
    reward_model: Box<dyn RewardModel>,
    dual: DualOptimizer,
    n_samples: usize,
}

impl RobustBackup {
    /// Constructs [`RobustBackup`].
    ///
    /// `in_dim` is the sum of the dimensions of observations and actions.
    pub fn build(
        config: &RobustConfig,
        in_dim: usize,
        batch_size: usize,
        device: &Device,
        seed: u64,
    ) -> Result<Self> {
        config.check()?;
        let delta = uncertainty_radius(config.train_std, config.eval_std)?;
        let reward_model = config.reward_model.build(in_dim, device, seed)?;
        let dual = DualOptimizer::new(
            delta,
            config.n_dual_steps,
            batch_size,
            &config.dual_opt_config,
            device,
        )?;
        info!("Robust reward backup with radius {}", delta);

        Ok(Self {
            reward_model,
            dual,
            n_samples: config.n_samples,
        })
    }

    /// Fits the reward model on a batch and returns the robust rewards of shape
    /// `(batch_size,)`, without gradient.
    ///
    /// The record has `loss_reward`, `robust_reward_mean` and `beta_mean`.
    pub fn robust_reward(
        &mut self,
        obs: &Tensor,
        act: &Tensor,
        reward: &Tensor,
    ) -> Result<(Tensor, Record)> {
        let loss_reward = self.reward_model.fit(obs, act, reward)?;
        let r_sample = self.reward_model.sample(obs, act, self.n_samples)?;
        let r_robust = self.dual.solve(&r_sample)?;

        let record = Record::from_slice(&[
            ("loss_reward", RecordValue::Scalar(loss_reward)),
            (
                "robust_reward_mean",
                RecordValue::Scalar(r_robust.mean_all()?.to_scalar::<f32>()?),
            ),
            (
                "beta_mean",
                RecordValue::Scalar(self.dual.beta()?.mean_all()?.to_scalar::<f32>()?),
            ),
        ]);

        Ok((r_robust, record))
    }

    /// Radius of the uncertainty set.
    pub fn delta(&self) -> f64 {
        self.dual.delta()
    }
}
