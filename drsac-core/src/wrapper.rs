//! Environment wrappers.
use crate::{Env, EnvSpec, Step};
use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Configuration of [`NoisyReward`].
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct NoisyRewardConfig<C> {
    /// Configuration of the wrapped environment.
    pub env_config: C,

    /// Standard deviation of the Gaussian noise added to rewards.
    pub std: f32,
}

/// Adds zero-mean Gaussian noise to every reward of the wrapped environment.
///
/// Using different standard deviations for training and evaluation creates
/// the reward distribution shift that the robust backup of the SAC agent
/// accounts for.
pub struct NoisyReward<E: Env> {
    env: E,
    noise: Normal<f32>,
    rng: StdRng,
}

impl<E: Env> Env for NoisyReward<E> {
    type Config = NoisyRewardConfig<E::Config>;
    type Info = E::Info;

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        Ok(Self {
            env: E::build(&config.env_config, seed)?,
            noise: Normal::new(0.0, config.std)?,
            rng: StdRng::seed_from_u64(seed as u64),
        })
    }

    fn spec(&self) -> EnvSpec {
        self.env.spec()
    }

    fn reset(&mut self, seed: u64) -> Result<(Vec<f32>, Self::Info)> {
        self.env.reset(seed)
    }

    fn step(&mut self, act: &[f32]) -> Result<Step<Self>> {
        let step = self.env.step(act)?;
        let reward = step.reward + self.noise.sample(&mut self.rng);
        Ok(Step::new(
            step.obs,
            step.act,
            reward,
            step.is_terminated,
            step.is_truncated,
            step.info,
        ))
    }
}
