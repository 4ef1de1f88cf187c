use super::{pt_path, RewardModel};
use crate::{
    mlp::{Mlp, MlpConfig},
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
    util::check_finite,
};
use anyhow::Result;
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{loss::cross_entropy, ops::softmax, VarBuilder, VarMap};
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, WeightedIndex};
use std::path::{Path, PathBuf};

/// Categorical reward model over a fixed finite support.
///
/// It is fitted with the cross-entropy against the index of the support value
/// nearest to the observed reward.
pub struct CategoricalRewardModel {
    device: Device,
    varmap: VarMap,
    net: Mlp,
    values: Vec<f32>,
    opt: Optimizer,
    rng: StdRng,
}

impl CategoricalRewardModel {
    /// Constructs [`CategoricalRewardModel`] taking inputs of dimension `in_dim`.
    pub fn build(
        in_dim: usize,
        units: Vec<i64>,
        values: Vec<f32>,
        opt_config: &OptimizerConfig,
        device: Device,
        seed: u64,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let net = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).pp("reward");
            let config = MlpConfig::new(in_dim as _, units, values.len() as _, false);
            <Mlp as SubModel1>::build(vb, config)?
        };
        let opt = opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            net,
            values,
            opt,
            rng: StdRng::seed_from_u64(seed),
        })
    }

    /// Index of the support value nearest to `r`. Ties go to the smaller index.
    pub fn nearest_index(&self, r: f32) -> usize {
        let mut ix = 0;
        for (i, v) in self.values.iter().enumerate() {
            if (v - r).abs() < (self.values[ix] - r).abs() {
                ix = i;
            }
        }
        ix
    }

    fn logits(&self, obs: &Tensor, act: &Tensor) -> Result<Tensor> {
        let sa = Tensor::cat(&[obs, act], D::Minus1)?;
        SubModel1::forward(&self.net, &sa)
    }
}

impl RewardModel for CategoricalRewardModel {
    fn predict(&self, obs: &Tensor, act: &Tensor) -> Result<Tensor> {
        let probs = softmax(&self.logits(obs, act)?, D::Minus1)?;
        let values = Tensor::from_slice(&self.values, (self.values.len(), 1), &self.device)?;
        Ok(probs.matmul(&values)?.squeeze(D::Minus1)?.detach())
    }

    fn fit(&mut self, obs: &Tensor, act: &Tensor, reward: &Tensor) -> Result<f32> {
        let logits = self.logits(obs, act)?;
        let targets: Vec<u32> = reward
            .to_vec1::<f32>()?
            .iter()
            .map(|&r| self.nearest_index(r) as u32)
            .collect();
        let targets = Tensor::from_vec(targets, reward.dims1()?, &self.device)?;
        let loss = cross_entropy(&logits, &targets)?;
        let loss_value = check_finite(&loss, "loss_reward")?;
        self.opt.backward_step(&loss)?;
        Ok(loss_value)
    }

    fn sample(&mut self, obs: &Tensor, act: &Tensor, n: usize) -> Result<Tensor> {
        let probs = softmax(&self.logits(obs, act)?, D::Minus1)?.to_vec2::<f32>()?;
        let batch_size = probs.len();
        let mut samples = Vec::with_capacity(batch_size * n);
        for p in probs.iter() {
            let dist = WeightedIndex::new(p)?;
            samples.extend((0..n).map(|_| self.values[dist.sample(&mut self.rng)]));
        }
        Ok(Tensor::from_vec(samples, (batch_size, n), &self.device)?)
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
