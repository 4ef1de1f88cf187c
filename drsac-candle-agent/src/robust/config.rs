//! Configuration of the robust reward backup.
use crate::opt::OptimizerConfig;
use anyhow::Result;
use drsac_core::error::DrsacError;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Which reward model to learn and how.
///
/// The network takes the concatenation of an observation and an action.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub enum RewardModelConfig {
    /// Gaussian reward with a learned mean and log standard deviation.
    Gaussian {
        /// Hidden units of the network.
        units: Vec<i64>,

        /// Optimizer of the network.
        opt_config: OptimizerConfig,
    },

    /// Categorical distribution over a finite set of reward values.
    Categorical {
        /// Hidden units of the network.
        units: Vec<i64>,

        /// Support of the distribution.
        values: Vec<f32>,

        /// Optimizer of the network.
        opt_config: OptimizerConfig,
    },
}

impl Default for RewardModelConfig {
    fn default() -> Self {
        Self::Gaussian {
            units: vec![256, 256],
            opt_config: OptimizerConfig::Adam { lr: 3e-5 },
        }
    }
}

impl RewardModelConfig {
    /// Checks the configuration.
    pub fn check(&self) -> Result<(), DrsacError> {
        let units = match self {
            Self::Gaussian { units, .. } => units,
            Self::Categorical { units, values, .. } => {
                if values.is_empty() {
                    return Err(DrsacError::InvalidConfig(
                        "The support of the categorical reward model is empty".into(),
                    ));
                }
                if values.iter().any(|v| !v.is_finite()) {
                    return Err(DrsacError::InvalidConfig(
                        "The support of the categorical reward model must be finite".into(),
                    ));
                }
                units
            }
        };
        if units.is_empty() || units.iter().any(|&u| u <= 0) {
            return Err(DrsacError::InvalidConfig(format!(
                "Hidden units of the reward model must be non-empty and positive, got {:?}",
                units
            )));
        }
        Ok(())
    }
}

/// Configuration of the distributionally robust reward backup.
///
/// The rewards observed in training are assumed to be corrupted by Gaussian
/// noise of standard deviation `train_std`, while those in evaluation have
/// `eval_std`. The radius of the KL ball follows from the two.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct RobustConfig {
    /// Standard deviation of the reward noise in training.
    pub train_std: f64,

    /// Standard deviation of the reward noise in evaluation.
    pub eval_std: f64,

    /// Number of reward samples per transition.
    pub n_samples: usize,

    /// Number of gradient steps on the dual variable per optimization step.
    pub n_dual_steps: usize,

    /// Optimizer of the dual variable.
    pub dual_opt_config: OptimizerConfig,

    /// Reward model.
    pub reward_model: RewardModelConfig,
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            train_std: 1.0,
            eval_std: 1.0,
            n_samples: 50,
            n_dual_steps: 10,
            dual_opt_config: OptimizerConfig::Adam { lr: 3e-5 },
            reward_model: RewardModelConfig::default(),
        }
    }
}

impl RobustConfig {
    /// Sets the standard deviations of the reward noise in training and evaluation.
    pub fn noise_std(mut self, train_std: f64, eval_std: f64) -> Self {
        self.train_std = train_std;
        self.eval_std = eval_std;
        self
    }

    /// Sets the number of reward samples per transition.
    pub fn n_samples(mut self, v: usize) -> Self {
        self.n_samples = v;
        self
    }

    /// Sets the number of gradient steps on the dual variable.
    pub fn n_dual_steps(mut self, v: usize) -> Self {
        self.n_dual_steps = v;
        self
    }

    /// Sets the optimizer of the dual variable.
    pub fn dual_opt_config(mut self, v: OptimizerConfig) -> Self {
        self.dual_opt_config = v;
        self
    }

    /// Sets the reward model.
    pub fn reward_model(mut self, v: RewardModelConfig) -> Self {
        self.reward_model = v;
        self
    }

    /// Checks the configuration, except the radius which is checked on construction.
    pub fn check(&self) -> Result<(), DrsacError> {
        if self.n_samples == 0 {
            return Err(DrsacError::InvalidConfig(
                "n_samples must be positive".into(),
            ));
        }
        if self.n_dual_steps == 0 {
            return Err(DrsacError::InvalidConfig(
                "n_dual_steps must be positive".into(),
            ));
        }
        self.reward_model.check()
    }

    /// Constructs [`RobustConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`RobustConfig`] as YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_robust_config() -> Result<()> {
        let config = RobustConfig::default()
            .noise_std(1.0, 2.0)
            .n_samples(20)
            .reward_model(RewardModelConfig::Categorical {
                units: vec![64],
                values: vec![-1.0, 0.0, 1.0],
                opt_config: OptimizerConfig::Adam { lr: 1e-3 },
            });

        let dir = TempDir::new("robust_config")?;
        let path = dir.path().join("robust_config.yaml");
        config.save(&path)?;
        let config_ = RobustConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }

    #[test]
    fn test_check() {
        assert!(RobustConfig::default().check().is_ok());
        assert!(RobustConfig::default().n_samples(0).check().is_err());
        let config = RobustConfig::default().reward_model(RewardModelConfig::Categorical {
            units: vec![64],
            values: vec![],
            opt_config: OptimizerConfig::default(),
        });
        assert!(config.check().is_err());
        let config = RobustConfig::default().reward_model(RewardModelConfig::Gaussian {
            units: vec![],
            opt_config: OptimizerConfig::default(),
        });
        assert!(config.check().is_err());
    }
}
