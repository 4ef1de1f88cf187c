//! Soft actor-critic agent with a distributionally robust reward backup,
//! implemented with [candle](https://crates.io/crates/candle-core).
//!
//! The agent plugs into the training loop of [`drsac_core`]. In the robust mode,
//! a learned reward model and a per-sample dual variable replace the observed
//! reward in the Bellman target by a pessimistic estimate over a KL ball.
pub mod lr_schedule;
pub mod mlp;
pub mod model;
pub mod opt;
pub mod robust;
pub mod sac;
mod tensor_batch;
pub mod util;
use anyhow::Result;
use serde::{Deserialize, Serialize};
pub use tensor_batch::TensorBatch;

#[derive(Clone, Debug, Copy, Deserialize, Serialize, PartialEq)]
/// Device for using candle.
///
/// This enum is added because [`candle_core::Device`] does not support serialization.
pub enum Device {
    /// The main CPU device.
    Cpu,

    /// The main GPU device.
    Cuda(usize),
}

impl Device {
    /// Returns the corresponding [`candle_core::Device`].
    pub fn build(&self) -> Result<candle_core::Device> {
        match self {
            Self::Cpu => Ok(candle_core::Device::Cpu),
            Self::Cuda(n) => Ok(candle_core::Device::new_cuda(*n)?),
        }
    }
}

impl Default for Device {
    fn default() -> Self {
        Self::Cpu
    }
}
