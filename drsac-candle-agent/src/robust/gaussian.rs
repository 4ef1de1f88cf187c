use super::{pt_path, RewardModel};
use crate::{
    mlp::{Mlp2, MlpConfig},
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
    util::{check_finite, randn},
};
use anyhow::Result;
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{loss::mse, VarBuilder, VarMap};
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use std::path::{Path, PathBuf};

const MIN_LOG_STD: f64 = -20.0;
const MAX_LOG_STD: f64 = 2.0;

/// Gaussian reward model `r ~ N(mu(s, a), std(s, a)^2)`.
///
/// It is fitted by regressing a reparameterized draw onto the observed reward.
pub struct GaussianRewardModel {
    device: Device,
    varmap: VarMap,
    net: Mlp2,
    opt: Optimizer,
    rng: StdRng,
}

impl GaussianRewardModel {
    /// Constructs [`GaussianRewardModel`] taking inputs of dimension `in_dim`.
    pub fn build(
        in_dim: usize,
        units: Vec<i64>,
        opt_config: &OptimizerConfig,
        device: Device,
        seed: u64,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let net = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).pp("reward");
            Mlp2::build(vb, MlpConfig::new(in_dim as _, units, 1, false))?
        };
        let opt = opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            net,
            opt,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Returns the mean and the standard deviation, both of shape `(batch_size, 1)`.
    fn dist(&self, obs: &Tensor, act: &Tensor) -> Result<(Tensor, Tensor)> {
        let sa = Tensor::cat(&[obs, act], D::Minus1)?;
        let (mu, log_std) = self.net.forward(&sa)?;
        let std = log_std.clamp(MIN_LOG_STD, MAX_LOG_STD)?.exp()?;
        Ok((mu, std))
    }
}

impl RewardModel for GaussianRewardModel {
    fn predict(&self, obs: &Tensor, act: &Tensor) -> Result<Tensor> {
        let (mu, _) = self.dist(obs, act)?;
        Ok(mu.squeeze(D::Minus1)?.detach())
    }

    fn fit(&mut self, obs: &Tensor, act: &Tensor, reward: &Tensor) -> Result<f32> {
        let (mu, std) = self.dist(obs, act)?;
        let eps = randn(&mut self.rng, mu.dims2()?, &self.device)?;
        let r = (mu + (std * eps)?)?.squeeze(D::Minus1)?;
        let loss = mse(&r, reward)?;
        let loss_value = check_finite(&loss, "loss_reward")?;
        self.opt.backward_step(&loss)?;
        Ok(loss_value)
    }

    fn sample(&mut self, obs: &Tensor, act: &Tensor, n: usize) -> Result<Tensor> {
        let (mu, std) = self.dist(obs, act)?;
        let batch_size = mu.dims2()?.0;
        let eps = randn(&mut self.rng, (batch_size, n), &self.device)?;
        Ok(mu.broadcast_add(&std.broadcast_mul(&eps)?)?.detach())
    }

    fn save(&self, prefix: &Path) -> Result<PathBuf> {
        let path = pt_path(prefix);
        self.varmap.save(&path)?;
        info!("Save reward model to {:?}", path);
        Ok(path)
    }

    fn load(&mut self, prefix: &Path) -> Result<()> {
        let path = pt_path(prefix);
        self.varmap.load(&path)?;
        info!("Load reward model from {:?}", path);
        Ok(())
    }
}
