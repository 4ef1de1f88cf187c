use anyhow::Result;
use candle_core::{Device, Tensor};
use drsac_core::TransitionBatch;

/// A batch of transitions as tensors on a device.
///
/// `obs` and `next_obs` have shape `(batch_size, obs_dim)`, `act` has shape
/// `(batch_size, act_dim)`, `reward` and `not_done` have shape `(batch_size,)`.
pub struct TensorBatch {
    /// Observations.
    pub obs: Tensor,

    /// Actions.
    pub act: Tensor,

    /// Next observations.
    pub next_obs: Tensor,

    /// Rewards.
    pub reward: Tensor,

    /// `1 - is_terminated`.
    pub not_done: Tensor,
}

impl TensorBatch {
    /// Converts a batch into tensors on the given device.
    pub fn from_batch<B: TransitionBatch>(batch: B, device: &Device) -> Result<Self> {
        let batch_size = batch.len();
        let obs_dim = batch.obs_dim();
        let act_dim = batch.act_dim();
        let (obs, act, next_obs, reward, is_terminated) = batch.unpack();
        let not_done: Vec<f32> = is_terminated.iter().map(|&d| 1f32 - d as f32).collect();

        Ok(Self {
            obs: Tensor::from_vec(obs, (batch_size, obs_dim), device)?,
            act: Tensor::from_vec(act, (batch_size, act_dim), device)?,
            next_obs: Tensor::from_vec(next_obs, (batch_size, obs_dim), device)?,
            reward: Tensor::from_vec(reward, batch_size, device)?,
            not_done: Tensor::from_vec(not_done, batch_size, device)?,
        })
    }

    /// Number of transitions.
    pub fn len(&self) -> usize {
        self.reward.dims()[0]
    }

    /// Returns `true` if the batch has no transition.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
