//! Actor with a tanh-squashed Gaussian policy.
use crate::{
    model::SubModel1,
    opt::{Optimizer, OptimizerConfig},
    util::{randn, softplus, OutDim},
};
use anyhow::{Context, Result};
use candle_core::{DType, Device, Tensor, D};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::{Path, PathBuf},
};

/// Log density of `tanh(u)` where `u ~ N(mean, exp(log_std)^2)`, summed over the last dimension.
///
/// The log determinant of the Jacobian of tanh is computed as
/// `2 * (ln 2 - u - softplus(-2u))`, which stays finite when `tanh(u)` rounds to `±1`.
pub fn squashed_gaussian_log_prob(u: &Tensor, mean: &Tensor, log_std: &Tensor) -> Result<Tensor> {
    let z = ((u - mean)? / log_std.exp()?)?;
    let log_n = ((z.sqr()? * -0.5)? - log_std)?;
    let log_n = (log_n - 0.5 * (2.0 * std::f64::consts::PI).ln())?;
    let log_jac = ((softplus(&(u * -2.0)?)? + u)?.neg()? + std::f64::consts::LN_2)?;
    let log_jac = (log_jac * 2.0)?;
    Ok((log_n - log_jac)?.sum(D::Minus1)?)
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`GaussianActor`].
pub struct GaussianActorConfig<P: OutDim> {
    /// Configuration of the network outputting the mean and the log standard deviation.
    pub policy_config: Option<P>,

    /// Configuration of the optimizer.
    pub opt_config: OptimizerConfig,

    /// Lower bound of the log standard deviation.
    pub min_log_std: f64,

    /// Upper bound of the log standard deviation.
    pub max_log_std: f64,
}

impl<P: OutDim> Default for GaussianActorConfig<P> {
    fn default() -> Self {
        Self {
            policy_config: None,
            opt_config: OptimizerConfig::Adam { lr: 0.0003 },
            min_log_std: -20.0,
            max_log_std: 2.0,
        }
    }
}

impl<P> GaussianActorConfig<P>
where
    P: DeserializeOwned + Serialize + OutDim,
{
    /// Sets the minimum value of log std.
    pub fn min_log_std(mut self, v: f64) -> Self {
        self.min_log_std = v;
        self
    }

    /// Sets the maximum value of log std.
    pub fn max_log_std(mut self, v: f64) -> Self {
        self.max_log_std = v;
        self
    }

    /// Sets configurations for policy function.
    pub fn policy_config(mut self, v: P) -> Self {
        self.policy_config = Some(v);
        self
    }

    /// Sets optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Loads [`GaussianActorConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`GaussianActorConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

/// Actor with a tanh-squashed Gaussian policy.
///
/// Actions are in `[-1, 1]`.
pub struct GaussianActor<P>
where
    P: SubModel1<Output = (Tensor, Tensor)>,
{
    device: Device,
    varmap: VarMap,

    // Dimension of the action vector.
    out_dim: i64,

    policy: P,
    opt: Optimizer,
    rng: StdRng,

    // Min/max log std
    min_log_std: f64,
    max_log_std: f64,
}

impl<P> GaussianActor<P>
where
    P: SubModel1<Output = (Tensor, Tensor)>,
{
    /// Constructs [`GaussianActor`].
    ///
    /// `seed` is used for the noise of stochastic actions.
    pub fn build(
        config: GaussianActorConfig<P::Config>,
        device: Device,
        seed: u64,
    ) -> Result<GaussianActor<P>> {
        let min_log_std = config.min_log_std;
        let max_log_std = config.max_log_std;
        let policy_config = config.policy_config.context("policy_config is not set.")?;
        let out_dim = policy_config.get_out_dim();
        let varmap = VarMap::new();
        let policy = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device).pp("actor");
            P::build(vb, policy_config)?
        };
        let opt = config.opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            out_dim,
            policy,
            opt,
            rng: StdRng::seed_from_u64(seed),
            min_log_std,
            max_log_std,
        })
    }

    /// Returns actions and optionally their log probabilities given observations.
    ///
    /// If `deterministic` is `true`, the action is `tanh(mean)`.
    /// Otherwise the pre-squash value is a reparameterized sample
    /// `mean + std * eps`, through which gradients flow to the parameters.
    ///
    /// The shape of the actions is `(batch_size, action_dim)` and that of
    /// the log probabilities is `(batch_size,)`.
    pub fn forward(
        &mut self,
        obs: &Tensor,
        deterministic: bool,
        with_logprob: bool,
    ) -> Result<(Tensor, Option<Tensor>)> {
        let (mean, log_std) = self.policy.forward(obs)?;
        debug_assert_eq!(mean.dims().len(), 2);
        debug_assert_eq!(mean.dims()[1], self.out_dim as usize);
        let log_std = log_std.clamp(self.min_log_std, self.max_log_std)?;

        let u = match deterministic {
            true => mean.clone(),
            false => {
                let eps = randn(&mut self.rng, mean.dims2()?, &self.device)?;
                (&mean + (log_std.exp()? * eps)?)?
            }
        };
        let act = u.tanh()?;
        let log_p = match with_logprob {
            true => Some(squashed_gaussian_log_prob(&u, &mean, &log_std)?),
            false => None,
        };

        Ok((act, log_p))
    }

    /// Returns an action for a single observation, without gradient tracking.
    pub fn select_action(&mut self, obs: &[f32], deterministic: bool) -> Result<Vec<f32>> {
        let obs = Tensor::from_slice(obs, (1, obs.len()), &self.device)?;
        let (act, _) = self.forward(&obs, deterministic, false)?;
        Ok(act.detach().squeeze(0)?.to_vec1::<f32>()?)
    }

    /// Does an optimization step on the parameters of the actor.
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

    /// Save variables to prefix + ".pt".
    pub fn save(&self, prefix: impl AsRef<Path>) -> Result<PathBuf> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("pt");
        self.varmap.save(path.as_path())?;
        info!("Save actor parameters to {:?}", path);

        Ok(path)
    }

    /// Load variables from prefix + ".pt".
    pub fn load(&mut self, prefix: impl AsRef<Path>) -> Result<()> {
        let mut path = PathBuf::from(prefix.as_ref());
        path.set_extension("pt");
        self.varmap.load(path.as_path())?;
        info!("Load actor parameters from {:?}", path);

        Ok(())
    }
}
