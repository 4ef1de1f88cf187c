//! This module is used for tests.
use crate::{Env, EnvSpec, Policy, Step};
use anyhow::Result;

/// Configuration of [`DummyEnv`].
#[derive(Clone, Debug)]
pub struct DummyEnvConfig {
    /// Reward returned by every step.
    pub reward: f32,

    /// Episodes are truncated after this number of steps.
    pub episode_len: usize,
}

/// Deterministic environment with a constant reward.
///
/// The observation is the number of steps taken in the current episode.
pub struct DummyEnv {
    config: DummyEnvConfig,
    t: usize,
}

impl Env for DummyEnv {
    type Config = DummyEnvConfig;
    type Info = ();

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            t: 0,
        })
    }

    fn spec(&self) -> EnvSpec {
        EnvSpec {
            state_dim: 1,
            action_dim: 1,
            max_action: 1.0,
            max_episode_steps: self.config.episode_len,
        }
    }

    fn reset(&mut self, _seed: u64) -> Result<(Vec<f32>, ())> {
        self.t = 0;
        Ok((vec![0.0], ()))
    }

    fn step(&mut self, act: &[f32]) -> Result<Step<Self>> {
        self.t += 1;
        Ok(Step::new(
            vec![self.t as f32],
            act.to_vec(),
            self.config.reward,
            false,
            self.t >= self.config.episode_len,
            (),
        ))
    }
}

/// Policy always returning the zero action.
pub struct DummyPolicy;

impl Policy for DummyPolicy {
    fn sample(&mut self, _obs: &[f32]) -> Result<Vec<f32>> {
        Ok(vec![0.0])
    }
}
