//! Configuration of SAC agent.
use super::{EntCoefMode, GaussianActorConfig, TwinCriticConfig};
use crate::{
    lr_schedule::LrSchedule,
    model::{SubModel1, SubModel2},
    robust::RobustConfig,
    util::{InDim, OutDim},
    Device,
};
use anyhow::Result;
use candle_core::Tensor;
use drsac_core::error::DrsacError;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Sac`](super::Sac).
#[allow(clippy::upper_case_acronyms)]
#[derive(Deserialize, Serialize)]
#[serde(bound = "")]
pub struct SacConfig<Q, P>
where
    Q: SubModel2,
    P: SubModel1<Output = (Tensor, Tensor)>,
{
    /// Dimension of observations.
    pub state_dim: usize,

    /// Dimension of actions.
    pub action_dim: usize,

    /// Configuration of the actor model.
    pub actor_config: GaussianActorConfig<P::Config>,

    /// Configuration of the critic model.
    pub critic_config: TwinCriticConfig<Q::Config>,

    /// Discount factor.
    pub gamma: f64,

    /// How to update entropy coefficient.
    pub ent_coef_mode: EntCoefMode,

    /// Number of parameter updates per optimization step.
    pub n_updates_per_opt: usize,

    /// Batch size for training.
    pub batch_size: usize,

    /// Learning rate schedule of the actor and the critic.
    pub lr_schedule: LrSchedule,

    /// Robust reward backup. If `None`, observed rewards are used in the Bellman target.
    pub robust: Option<RobustConfig>,

    /// Device for the models.
    pub device: Option<Device>,

    /// Random seed for sampling actions and rewards.
    pub seed: u64,
}

impl<Q, P> Clone for SacConfig<Q, P>
where
    Q: SubModel2,
    P: SubModel1<Output = (Tensor, Tensor)>,
{
    fn clone(&self) -> Self {
        Self {
            state_dim: self.state_dim,
            action_dim: self.action_dim,
            actor_config: self.actor_config.clone(),
            critic_config: self.critic_config.clone(),
            gamma: self.gamma,
            ent_coef_mode: self.ent_coef_mode.clone(),
            n_updates_per_opt: self.n_updates_per_opt,
            batch_size: self.batch_size,
            lr_schedule: self.lr_schedule.clone(),
            robust: self.robust.clone(),
            device: self.device,
            seed: self.seed,
        }
    }
}

impl<Q, P> Default for SacConfig<Q, P>
where
    Q: SubModel2,
    P: SubModel1<Output = (Tensor, Tensor)>,
{
    fn default() -> Self {
        Self {
            state_dim: 1,
            action_dim: 1,
            actor_config: Default::default(),
            critic_config: Default::default(),
            gamma: 0.99,
            ent_coef_mode: EntCoefMode::Auto(0.12, 0.0003),
            n_updates_per_opt: 1,
            batch_size: 256,
            lr_schedule: LrSchedule::Constant,
            robust: None,
            device: None,
            seed: 0,
        }
    }
}

impl<Q, P> SacConfig<Q, P>
where
    Q: SubModel2,
    P: SubModel1<Output = (Tensor, Tensor)>,
{
    /// Sets the dimensions of observations and actions.
    pub fn dims(mut self, state_dim: usize, action_dim: usize) -> Self {
        self.state_dim = state_dim;
        self.action_dim = action_dim;
        self
    }

    /// Sets the numper of parameter update steps per optimization step.
    pub fn n_updates_per_opt(mut self, v: usize) -> Self {
        self.n_updates_per_opt = v;
        self
    }

    /// Batch size.
    pub fn batch_size(mut self, v: usize) -> Self {
        self.batch_size = v;
        self
    }

    /// Discount factor.
    pub fn discount_factor(mut self, v: f64) -> Self {
        self.gamma = v;
        self
    }

    /// SAC-alpha.
    pub fn ent_coef_mode(mut self, v: EntCoefMode) -> Self {
        self.ent_coef_mode = v;
        self
    }

    /// Learning rate schedule.
    pub fn lr_schedule(mut self, v: LrSchedule) -> Self {
        self.lr_schedule = v;
        self
    }

    /// Enables the robust reward backup.
    pub fn robust(mut self, v: RobustConfig) -> Self {
        self.robust = Some(v);
        self
    }

    /// Configuration of actor.
    pub fn actor_config(mut self, actor_config: GaussianActorConfig<P::Config>) -> Self {
        self.actor_config = actor_config;
        self
    }

    /// Configuration of critic.
    pub fn critic_config(mut self, critic_config: TwinCriticConfig<Q::Config>) -> Self {
        self.critic_config = critic_config;
        self
    }

    /// Device.
    pub fn device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Checks the consistency of the configuration.
    pub fn check(&self) -> Result<(), DrsacError> {
        let invalid = |msg: String| Err(DrsacError::InvalidConfig(msg));

        if self.state_dim == 0 || self.action_dim == 0 {
            return invalid(format!(
                "Dimensions must be positive, got state_dim = {}, action_dim = {}",
                self.state_dim, self.action_dim
            ));
        }
        if self.batch_size == 0 || self.n_updates_per_opt == 0 {
            return invalid("batch_size and n_updates_per_opt must be positive".into());
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return invalid(format!("gamma must be in [0, 1], got {}", self.gamma));
        }
        match self.ent_coef_mode {
            EntCoefMode::Fix(alpha) | EntCoefMode::Auto(alpha, _) if !(alpha > 0.0) => {
                return invalid(format!("alpha must be positive, got {}", alpha));
            }
            _ => {}
        }
        if !(self.critic_config.tau > 0.0 && self.critic_config.tau <= 1.0) {
            return invalid(format!(
                "tau must be in (0, 1], got {}",
                self.critic_config.tau
            ));
        }

        let check_dim = |name: &str, expected: usize, actual: i64| {
            if actual as usize != expected {
                Err(DrsacError::DimensionMismatch {
                    name: name.to_string(),
                    expected,
                    actual: actual as usize,
                })
            } else {
                Ok(())
            }
        };
        let p = self
            .actor_config
            .policy_config
            .as_ref()
            .ok_or_else(|| DrsacError::InvalidConfig("policy_config is not set".into()))?;
        check_dim("input of the actor", self.state_dim, p.get_in_dim())?;
        check_dim("output of the actor", self.action_dim, p.get_out_dim())?;
        let q = self
            .critic_config
            .q_config
            .as_ref()
            .ok_or_else(|| DrsacError::InvalidConfig("q_config is not set".into()))?;
        check_dim(
            "input of the critic",
            self.state_dim + self.action_dim,
            q.get_in_dim(),
        )?;
        check_dim("output of the critic", 1, q.get_out_dim())?;

        self.lr_schedule.check()?;
        if let Some(robust) = &self.robust {
            robust.check()?;
        }
        Ok(())
    }

    /// Constructs [`SacConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of SAC agent from {:?}", path_);
        Ok(b)
    }

    /// Saves [`SacConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of SAC agent into {:?}", path_);
        Ok(())
    }
}
