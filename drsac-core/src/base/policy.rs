//! Policy.
use anyhow::Result;
use serde::de::DeserializeOwned;
use std::path::Path;

/// A mapping from an observation to an action.
///
/// The mapping can be either of deterministic or stochastic.
/// Actions are in the agent-internal range `[-1, 1]`.
pub trait Policy {
    /// Sample an action given an observation.
    fn sample(&mut self, obs: &[f32]) -> Result<Vec<f32>>;
}

/// An object constructed from a validated configuration.
pub trait Configurable {
    /// Configuration.
    type Config: Clone + DeserializeOwned;

    /// Builds the object.
    fn build(config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Builds the object with the configuration in the yaml file of the given path.
    fn build_from_path(path: impl AsRef<Path>) -> Result<Self>
    where
        Self: Sized,
    {
        let file = std::fs::File::open(path)?;
        let rdr = std::io::BufReader::new(file);
        let config = serde_yaml::from_reader(rdr)?;
        Self::build(config)
    }
}
