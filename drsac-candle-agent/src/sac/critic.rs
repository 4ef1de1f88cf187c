//! Twin critic for agents with continuous action.
use crate::{
    model::SubModel2,
    opt::{Optimizer, OptimizerConfig},
    util::track_with_replace_substring,
};
use anyhow::{Context, Result};
use candle_core::{DType::F32, Device, Tensor, D};
use candle_nn::{loss::mse, VarBuilder, VarMap};
use log::info;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`TwinCritic`].
pub struct TwinCriticConfig<Q> {
    /// Configuration of each of the two critic networks.
    pub q_config: Option<Q>,

    /// Configuration of the optimizer.
    pub opt_config: OptimizerConfig,

    /// Soft update coefficient.
    pub tau: f64,
}

impl<Q> Default for TwinCriticConfig<Q> {
    fn default() -> Self {
        Self {
            q_config: None,
            opt_config: OptimizerConfig::Adam { lr: 0.0003 },
            tau: 0.005,
        }
    }
}

impl<Q> TwinCriticConfig<Q>
where
    Q: DeserializeOwned + Serialize,
{
    /// Sets configurations for action-value function.
    pub fn q_config(mut self, v: Q) -> Self {
        self.q_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets soft update parameter tau.
    pub fn tau(mut self, v: f64) -> Self {
        self.tau = v;
        self
    }

    /// Constructs [`TwinCriticConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TwinCriticConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Two critics and their target networks.
///
/// Each critic takes observations and actions and outputs action values.
/// The target networks start as exact copies of the critics and are changed
/// only by [`TwinCritic::soft_update`] and [`TwinCritic::sync_target`].
pub struct TwinCritic<Q>
where
    Q: SubModel2,
{
    tau: f64,
    varmap: VarMap,
    varmap_tgt: VarMap,
    qs: [Q; 2],
    qs_tgt: [Q; 2],
    opt: Optimizer,
}

impl<Q> TwinCritic<Q>
where
    Q: SubModel2,
{
    /// Constructs [`TwinCritic`].
    pub fn build(config: TwinCriticConfig<Q::Config>, device: Device) -> Result<TwinCritic<Q>> {
        let tau = config.tau;
        let q_config = config.q_config.context("q_config is not set.")?;

        let (varmap, qs) = Self::build_critic_networks(&q_config, &device, "critic")?;
        let (varmap_tgt, qs_tgt) = Self::build_critic_networks(&q_config, &device, "critic_tgt")?;

        // No optimizer for the target networks
        let opt = config.opt_config.build(varmap.all_vars())?;

        let critic = Self {
            tau,
            varmap,
            varmap_tgt,
            qs,
            qs_tgt,
            opt,
        };
        critic.sync_target()?;

        Ok(critic)
    }

    fn build_critic_networks(
        q_config: &Q::Config,
        device: &Device,
        prefix: &str,
    ) -> Result<(VarMap, [Q; 2])> {
        let varmap = VarMap::new();
        let build = |ix: usize| {
            let vb = VarBuilder::from_varmap(&varmap, F32, device).pp(format!("{}{}", prefix, ix));
            Q::build(vb, q_config.clone())
        };
        let qs = [build(0)?, build(1)?];

        Ok((varmap, qs))
    }

    /// Soft update of the target networks, `target = tau * online + (1 - tau) * target`.
    pub fn soft_update(&mut self) -> Result<()> {
        track_with_replace_substring(
            &self.varmap_tgt,
            &self.varmap,
            self.tau,
            ("critic", "critic_tgt"),
        )
    }

    /// Copies the parameters of the critics to the target networks.
    pub fn sync_target(&self) -> Result<()> {
        track_with_replace_substring(&self.varmap_tgt, &self.varmap, 1.0, ("critic", "critic_tgt"))
    }

    /// Returns action values of both critics, each of shape `(batch_size,)`.
    pub fn qvals(&self, obs: &Tensor, act: &Tensor) -> Result<[Tensor; 2]> {
        Ok([
            self.qs[0].forward(obs, act)?.squeeze(D::Minus1)?,
            self.qs[1].forward(obs, act)?.squeeze(D::Minus1)?,
        ])
    }

    /// Returns the minimum of the action values of the critics.
    ///
    /// Gradients flow back to `act` but not to the parameters of the critics.
    pub fn qvals_min_frozen(&self, obs: &Tensor, act: &Tensor) -> Result<Tensor> {
        let q1 = self.qs[0].detach().forward(obs, act)?.squeeze(D::Minus1)?;
        let q2 = self.qs[1].detach().forward(obs, act)?.squeeze(D::Minus1)?;
        Ok(q1.minimum(&q2)?)
    }

    /// Returns the minimum of the action values of the target networks.
    pub fn qvals_min_tgt(&self, obs: &Tensor, act: &Tensor) -> Result<Tensor> {
        let q1 = self.qs_tgt[0].forward(obs, act)?.squeeze(D::Minus1)?;
        let q2 = self.qs_tgt[1].forward(obs, act)?.squeeze(D::Minus1)?;
        Ok(q1.minimum(&q2)?.detach())
    }

    /// Returns `MSE(Q1, tgt) + MSE(Q2, tgt)`.
    pub fn loss(&self, obs: &Tensor, act: &Tensor, tgt: &Tensor) -> Result<Tensor> {
        let [q1, q2] = self.qvals(obs, act)?;
        Ok((mse(&q1, tgt)? + mse(&q2, tgt)?)?)
    }

    /// Backward step for all variables in critic networks.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    /// Sets the learning rate of the optimizer.
    pub fn set_learning_rate(&mut self, lr: f64) {
        self.opt.set_learning_rate(lr);
    }

    /// Returns the learning rate of the optimizer.
    pub fn learning_rate(&self) -> f64 {
        self.opt.learning_rate()
    }

    /// Save the variables of the critics to prefix + ".pt".
    ///
    /// The target networks are not saved.
    pub fn save<T: AsRef<Path>>(&self, prefix: T) -> Result<PathBuf> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("pt");
        self.varmap.save(path.as_path())?;
        info!("Save critics to {:?}", path);

        Ok(path)
    }

    /// Load the variables of the critics from prefix + ".pt" and copy them to
    /// the target networks.
    pub fn load<T: AsRef<Path>>(&mut self, prefix: T) -> Result<()> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("pt");
        self.varmap.load(path.as_path())?;
        self.sync_target()?;
        info!("Load critics from {:?}", path);

        Ok(())
    }
}
