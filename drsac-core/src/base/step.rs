//! Environment step.
use super::Env;

/// Additional information to observations and rewards.
pub trait Info {}

impl Info for () {}

/// Outcome of an environment step `(a_t, o_t+1, r_t)`.
pub struct Step<E: Env> {
    /// Action applied to the environment.
    pub act: Vec<f32>,

    /// Next observation.
    pub obs: Vec<f32>,

    /// Reward.
    pub reward: f32,

    /// The episode reached a terminal state.
    pub is_terminated: bool,

    /// The episode was cut off, e.g., by a time limit.
    pub is_truncated: bool,

    /// Information defined by the environment.
    pub info: E::Info,
}

impl<E: Env> Step<E> {
    /// Constructs a [`Step`] object.
    pub fn new(
        obs: Vec<f32>,
        act: Vec<f32>,
        reward: f32,
        is_terminated: bool,
        is_truncated: bool,
        info: E::Info,
    ) -> Self {
        Step {
            act,
            obs,
            reward,
            is_terminated,
            is_truncated,
            info,
        }
    }

    #[inline]
    /// Terminated or truncated.
    pub fn is_done(&self) -> bool {
        self.is_terminated || self.is_truncated
    }
}
