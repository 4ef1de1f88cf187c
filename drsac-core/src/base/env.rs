//! Environment.
use super::{Info, Step};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Static properties of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct EnvSpec {
    /// Dimension of the observation vector.
    pub state_dim: usize,

    /// Dimension of the action vector.
    pub action_dim: usize,

    /// Actions of the environment lie in `[-max_action, max_action]` per dimension.
    pub max_action: f32,

    /// Episodes are truncated after this number of steps.
    pub max_episode_steps: usize,
}

/// Represents an environment with continuous observations and actions.
///
/// Observations and actions are plain vectors. Actions given to [`Env::step`]
/// are in the scale of the environment, `[-max_action, max_action]`.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Returns the static properties of the environment.
    fn spec(&self) -> EnvSpec;

    /// Starts a new episode and returns the initial observation.
    fn reset(&mut self, seed: u64) -> Result<(Vec<f32>, Self::Info)>;

    /// Performs an environment step.
    fn step(&mut self, act: &[f32]) -> Result<Step<Self>>
    where
        Self: Sized;
}
