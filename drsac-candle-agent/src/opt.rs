//! Optimizers.
use anyhow::Result;
use candle_core::{Tensor, Var};
use candle_nn::{AdamW, Optimizer as _, ParamsAdamW};
use candle_optimisers::adam::{Adam, ParamsAdam};
use serde::{Deserialize, Serialize};

/// Configuration of optimizer for training neural networks in the agent.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub enum OptimizerConfig {
    /// AdamW optimizer.
    AdamW {
        /// Learning rate.
        lr: f64,
        #[allow(missing_docs)]
        #[serde(default = "default_beta1")]
        beta1: f64,
        #[allow(missing_docs)]
        #[serde(default = "default_beta2")]
        beta2: f64,
        #[allow(missing_docs)]
        #[serde(default = "default_eps")]
        eps: f64,
        #[allow(missing_docs)]
        #[serde(default = "default_weight_decay")]
        weight_decay: f64,
    },

    /// Adam optimizer.
    Adam {
        /// Learning rate.
        lr: f64,
    },
}

fn default_beta1() -> f64 {
    ParamsAdamW::default().beta1
}

fn default_beta2() -> f64 {
    ParamsAdamW::default().beta2
}

fn default_eps() -> f64 {
    ParamsAdamW::default().eps
}

fn default_weight_decay() -> f64 {
    ParamsAdamW::default().weight_decay
}

impl OptimizerConfig {
    /// Constructs an optimizer for the given variables.
    pub fn build(&self, vars: Vec<Var>) -> Result<Optimizer> {
        match &self {
            OptimizerConfig::AdamW {
                lr,
                beta1,
                beta2,
                eps,
                weight_decay,
            } => {
                let params = ParamsAdamW {
                    lr: *lr,
                    beta1: *beta1,
                    beta2: *beta2,
                    eps: *eps,
                    weight_decay: *weight_decay,
                };
                let opt = AdamW::new(vars, params)?;
                Ok(Optimizer::AdamW(opt))
            }
            OptimizerConfig::Adam { lr } => {
                let params = ParamsAdam {
                    lr: *lr,
                    ..ParamsAdam::default()
                };
                let opt = Adam::new(vars, params)?;
                Ok(Optimizer::Adam(opt))
            }
        }
    }

    /// Replaces the learning rate, keeping the other parameters.
    pub fn learning_rate(mut self, v: f64) -> Self {
        match &mut self {
            Self::AdamW { lr, .. } | Self::Adam { lr } => *lr = v,
        }
        self
    }

    /// Returns the learning rate.
    pub fn lr(&self) -> f64 {
        match self {
            Self::AdamW { lr, .. } | Self::Adam { lr } => *lr,
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self::Adam { lr: 0.0003 }
    }
}

/// Optimizers.
///
/// This is a thin wrapper of [`candle_nn::Optimizer`] implementations.
pub enum Optimizer {
    /// AdamW optimizer.
    AdamW(AdamW),

    /// Adam optimizer.
    Adam(Adam),
}

impl Optimizer {
    /// Computes the gradients of the loss and updates the variables owned by
    /// this optimizer. Other variables in the graph are left untouched.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        match self {
            Self::AdamW(opt) => Ok(opt.backward_step(loss)?),
            Self::Adam(opt) => Ok(opt.backward_step(loss)?),
        }
    }

    /// Returns the current learning rate.
    pub fn learning_rate(&self) -> f64 {
        match self {
            Self::AdamW(opt) => opt.learning_rate(),
            Self::Adam(opt) => opt.learning_rate(),
        }
    }

    /// Sets the learning rate.
    pub fn set_learning_rate(&mut self, lr: f64) {
        match self {
            Self::AdamW(opt) => opt.set_learning_rate(lr),
            Self::Adam(opt) => opt.set_learning_rate(lr),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::Device;
    use tempdir::TempDir;

    fn minimize(config: &OptimizerConfig, target: f32, n_steps: usize) -> Result<f32> {
        let x = Var::new(&[0f32], &Device::Cpu)?;
        let mut opt = config.build(vec![x.clone()])?;
        for _ in 0..n_steps {
            let loss = (x.as_tensor() - target as f64)?.sqr()?.sum_all()?;
            opt.backward_step(&loss)?;
        }
        Ok(x.as_tensor().to_vec1::<f32>()?[0])
    }

    #[test]
    fn test_adamw_defaults_from_yaml() -> Result<()> {
        let config: OptimizerConfig = serde_yaml::from_str("AdamW:\n  lr: 0.001\n")?;
        let defaults = ParamsAdamW::default();
        assert_eq!(
            config,
            OptimizerConfig::AdamW {
                lr: 0.001,
                beta1: defaults.beta1,
                beta2: defaults.beta2,
                eps: defaults.eps,
                weight_decay: defaults.weight_decay,
            }
        );

        let dir = TempDir::new("opt")?;
        let path = dir.path().join("opt.yaml");
        std::fs::write(&path, serde_yaml::to_string(&config)?)?;
        let config_: OptimizerConfig = serde_yaml::from_str(&std::fs::read_to_string(&path)?)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_learning_rate_override() {
        let config = OptimizerConfig::AdamW {
            lr: 0.1,
            beta1: 0.8,
            beta2: 0.9,
            eps: 1e-6,
            weight_decay: 0.0,
        }
        .learning_rate(0.5);
        assert_eq!(config.lr(), 0.5);
        assert!(matches!(config, OptimizerConfig::AdamW { beta1, .. } if beta1 == 0.8));

        assert_eq!(OptimizerConfig::default().learning_rate(0.2).lr(), 0.2);
    }

    #[test]
    fn test_optimizers_reduce_loss() -> Result<()> {
        let adamw = OptimizerConfig::AdamW {
            lr: 0.05,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            weight_decay: 0.0,
        };
        let adam = OptimizerConfig::Adam { lr: 0.05 };
        for config in [adamw, adam] {
            let x = minimize(&config, 3.0, 300)?;
            assert!((x - 3.0).abs() < 0.3, "{:?}: x = {}", config, x);
        }
        Ok(())
    }

    #[test]
    fn test_set_learning_rate() -> Result<()> {
        for config in [
            OptimizerConfig::default().learning_rate(1e-3),
            OptimizerConfig::AdamW {
                lr: 1e-3,
                beta1: 0.9,
                beta2: 0.999,
                eps: 1e-8,
                weight_decay: 0.01,
            },
        ] {
            let mut opt = config.build(vec![Var::new(&[0f32], &Device::Cpu)?])?;
            assert_eq!(opt.learning_rate(), 1e-3);
            opt.set_learning_rate(0.25);
            assert_eq!(opt.learning_rate(), 0.25);
        }
        Ok(())
    }
}
