//! Dual form of the worst-case expected reward over a KL ball.
//!
//! For reward samples `R_1, ..., R_n` and a radius `delta`, the worst-case mean
//! reward over distributions within KL divergence `delta` of the empirical one is
//!
//! ```text
//! max_{beta > 0} g(beta),  g(beta) = -beta * (logsumexp(-R / beta) - ln n) - beta * delta
//! ```
use crate::{
    opt::{Optimizer, OptimizerConfig},
    util::log_sum_exp,
};
use anyhow::Result;
use candle_core::{DType, Device, Tensor, Var, D};
use drsac_core::error::DrsacError;
use log::debug;

/// Returns the KL divergence `KL(N(0, eval_std^2) || N(0, train_std^2))`,
/// used as the radius of the uncertainty set.
///
/// `0.5 * (eval_var / train_var + ln(train_var / eval_var) - 1)`
pub fn uncertainty_radius(train_std: f64, eval_std: f64) -> Result<f64, DrsacError> {
    if !(train_std.is_finite() && eval_std.is_finite()) || train_std <= 0.0 || eval_std <= 0.0 {
        return Err(DrsacError::InvalidConfig(format!(
            "Standard deviations of the reward noise must be positive and finite, got {} and {}",
            train_std, eval_std
        )));
    }
    let train_var = train_std * train_std;
    let eval_var = eval_std * eval_std;
    let delta = 0.5 * (eval_var / train_var + (train_var / eval_var).ln() - 1.0);

    // Rounding can give a tiny negative value when the stds are equal
    let delta = if delta < 0.0 && delta > -1e-12 { 0.0 } else { delta };
    if !delta.is_finite() || delta < 0.0 {
        return Err(DrsacError::InvalidConfig(format!(
            "Invalid radius of the uncertainty set: {}",
            delta
        )));
    }
    Ok(delta)
}

/// Evaluates the dual objective `g(beta)` row-wise.
///
/// `r` has shape `(batch_size, n)` and `beta` has shape `(batch_size, 1)`.
/// Returns a tensor of shape `(batch_size, 1)`.
pub fn dual_objective(r: &Tensor, beta: &Tensor, delta: f64) -> Result<Tensor> {
    let n = r.dims2()?.1 as f64;
    let lse = log_sum_exp(&r.neg()?.broadcast_div(beta)?)?;
    let tmp = ((lse - n.ln())? + delta)?;
    Ok((beta * tmp)?.neg()?)
}

/// Maximizes the dual objective per transition with a fixed number of gradient steps.
///
/// The dual variable is `beta = exp(beta_raw)`, one per row of a batch.
/// `beta_raw` starts at zero and is carried over between calls of
/// [`DualOptimizer::solve`].
pub struct DualOptimizer {
    delta: f64,
    n_steps: usize,
    batch_size: usize,
    beta_raw: Var,
    opt: Optimizer,
}

impl DualOptimizer {
    /// Constructs [`DualOptimizer`].
    pub fn new(
        delta: f64,
        n_steps: usize,
        batch_size: usize,
        opt_config: &OptimizerConfig,
        device: &Device,
    ) -> Result<Self> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(DrsacError::InvalidConfig(format!("Invalid radius: {}", delta)).into());
        }
        let beta_raw = Var::zeros((batch_size, 1), DType::F32, device)?;
        let opt = opt_config.build(vec![beta_raw.clone()])?;

        Ok(Self {
            delta,
            n_steps,
            batch_size,
            beta_raw,
            opt,
        })
    }

    /// Radius of the uncertainty set.
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Returns the current dual variable `exp(beta_raw)` of shape `(batch_size, 1)`.
    pub fn beta(&self) -> Result<Tensor> {
        Ok(self.beta_raw.as_tensor().detach().exp()?)
    }

    /// Runs the gradient steps on reward samples of shape `(batch_size, n)` and
    /// returns the robust rewards `g(beta)` of shape `(batch_size,)`, without gradient.
    pub fn solve(&mut self, r: &Tensor) -> Result<Tensor> {
        let batch_size = r.dims2()?.0;
        if batch_size != self.batch_size {
            return Err(DrsacError::DimensionMismatch {
                name: "reward samples".into(),
                expected: self.batch_size,
                actual: batch_size,
            }
            .into());
        }
        let r = r.detach();

        for _ in 0..self.n_steps {
            let beta = self.beta_raw.as_tensor().exp()?;
            let loss = dual_objective(&r, &beta, self.delta)?.neg()?.sum_all()?;
            self.opt.backward_step(&loss)?;
        }
        debug!("beta_raw updated with {} steps", self.n_steps);

        let g = dual_objective(&r, &self.beta()?, self.delta)?;
        Ok(g.squeeze(D::Minus1)?.detach())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_radius_zero_for_equal_std() -> Result<()> {
        for &s in [0.1, 1.0, 3.7].iter() {
            assert_eq!(uncertainty_radius(s, s)?, 0.0);
        }
        Ok(())
    }

    #[test]
    fn test_radius_is_gaussian_kl() -> Result<()> {
        for &(train_std, eval_std) in [(1.0, 2.0), (0.5, 0.6), (2.0, 1.0)].iter() {
            let delta = uncertainty_radius(train_std, eval_std)?;
            let kl = (train_std / eval_std).ln() + eval_std * eval_std / (2.0 * train_std * train_std)
                - 0.5;
            assert!(delta > 0.0);
            assert!((delta - kl).abs() < 1e-12);
        }
        Ok(())
    }

    #[test]
    fn test_radius_rejects_invalid_std() {
        assert!(uncertainty_radius(0.0, 1.0).is_err());
        assert!(uncertainty_radius(1.0, -1.0).is_err());
        assert!(uncertainty_radius(f64::NAN, 1.0).is_err());
        assert!(uncertainty_radius(1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_objective_of_constant_rewards() -> Result<()> {
        let r = Tensor::full(2.5f32, (3, 10), &Device::Cpu)?;
        let beta = Tensor::from_slice(&[0.01f32, 1.0, 100.0], (3, 1), &Device::Cpu)?;
        let g = dual_objective(&r, &beta, 0.0)?.to_vec2::<f32>()?;
        for g in g.iter() {
            assert!((g[0] - 2.5).abs() < 1e-3, "{}", g[0]);
        }
        Ok(())
    }

    #[test]
    fn test_objective_is_pessimistic() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(42);
        let (batch_size, n) = (8, 50);
        let samples: Vec<f32> = (0..batch_size * n).map(|_| rng.gen_range(-3f32..3f32)).collect();
        let r = Tensor::from_vec(samples.clone(), (batch_size, n), &Device::Cpu)?;
        for &b in [0.001f32, 0.1, 1.0, 10.0].iter() {
            let beta = Tensor::full(b, (batch_size, 1), &Device::Cpu)?;
            let g = dual_objective(&r, &beta, 0.3)?.to_vec2::<f32>()?;
            for (i, g) in g.iter().enumerate() {
                let row = &samples[i * n..(i + 1) * n];
                let mean = row.iter().sum::<f32>() / n as f32;
                let min = row.iter().cloned().fold(f32::INFINITY, f32::min);
                assert!(g[0].is_finite());
                assert!(g[0] <= mean + 1e-4);
                assert!(g[0] >= min - b * 0.3 - 1e-3);
            }
        }
        Ok(())
    }

    #[test]
    fn test_solve_reaches_grid_maximum() -> Result<()> {
        let delta = 0.1;
        let row = [0f32, 1.0, 2.0, 3.0];

        // Grid search over beta_raw in [-5, 5], one grid point per row
        let n_grid = 1001;
        let r = Tensor::from_vec(row.repeat(n_grid), (n_grid, 4), &Device::Cpu)?;
        let beta: Vec<f32> = (0..n_grid).map(|i| (-5.0 + 0.01 * i as f32).exp()).collect();
        let beta = Tensor::from_vec(beta, (n_grid, 1), &Device::Cpu)?;
        let g_max = dual_objective(&r, &beta, delta)?
            .flatten_all()?
            .max(0)?
            .to_scalar::<f32>()?;

        let mut dual =
            DualOptimizer::new(delta, 500, 1, &OptimizerConfig::Adam { lr: 0.05 }, &Device::Cpu)?;
        let r = Tensor::from_slice(&row, (1, 4), &Device::Cpu)?;
        let g = dual.solve(&r)?.to_vec1::<f32>()?[0];
        assert!(g <= 1.5);
        assert!((g - g_max).abs() < 1e-2, "{} != {}", g, g_max);
        Ok(())
    }

    #[test]
    fn test_dual_variable_is_warm_started() -> Result<()> {
        let mut dual =
            DualOptimizer::new(0.5, 10, 2, &OptimizerConfig::Adam { lr: 0.01 }, &Device::Cpu)?;
        assert_eq!(dual.beta()?.to_vec2::<f32>()?, vec![vec![1.0], vec![1.0]]);

        let r = Tensor::from_slice(&[0f32, 1.0, 2.0, -1.0, 0.0, 4.0], (2, 3), &Device::Cpu)?;
        dual.solve(&r)?;
        let beta1 = dual.beta()?.to_vec2::<f32>()?;
        assert_ne!(beta1, vec![vec![1.0], vec![1.0]]);
        dual.solve(&r)?;
        let beta2 = dual.beta()?.to_vec2::<f32>()?;
        assert_ne!(beta1, beta2);

        let r = Tensor::zeros((3, 3), DType::F32, &Device::Cpu)?;
        assert!(dual.solve(&r).is_err());
        Ok(())
    }
}
