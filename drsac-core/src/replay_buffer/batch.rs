use crate::TransitionBatch;

/// A batch of transitions sampled from [`SimpleReplayBuffer`](super::SimpleReplayBuffer).
///
/// The `i`-th row of every field belongs to the same transition.
#[derive(Debug, Clone, PartialEq)]
pub struct StdBatch {
    /// Observations, `len * obs_dim` values.
    pub obs: Vec<f32>,

    /// Actions, `len * act_dim` values.
    pub act: Vec<f32>,

    /// Next observations, `len * obs_dim` values.
    pub next_obs: Vec<f32>,

    /// Rewards.
    pub reward: Vec<f32>,

    /// Terminal flags, `1` if the episode ended in a terminal state.
    pub is_terminated: Vec<i8>,

    /// Indices of the samples in the buffer.
    pub ix_sample: Vec<usize>,

    pub(super) obs_dim: usize,
    pub(super) act_dim: usize,
}

impl TransitionBatch for StdBatch {
    fn unpack(self) -> (Vec<f32>, Vec<f32>, Vec<f32>, Vec<f32>, Vec<i8>) {
        (
            self.obs,
            self.act,
            self.next_obs,
            self.reward,
            self.is_terminated,
        )
    }

    fn len(&self) -> usize {
        self.reward.len()
    }

    fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    fn act_dim(&self) -> usize {
        self.act_dim
    }
}
