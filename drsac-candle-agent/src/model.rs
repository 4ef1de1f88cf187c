//! Interface of neural networks used in the agent.
use crate::util::{InDim, OutDim};
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::VarBuilder;
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;

/// Configuration of a neural network.
///
/// Implemented for every type satisfying the bounds.
pub trait SubModelConfig:
    Clone + Debug + PartialEq + Serialize + DeserializeOwned + InDim + OutDim
{
}

impl<T> SubModelConfig for T where
    T: Clone + Debug + PartialEq + Serialize + DeserializeOwned + InDim + OutDim
{
}

/// Neural network model not owing its [`VarMap`] internally.
///
/// [`VarMap`]: candle_nn::VarMap
pub trait SubModel1 {
    /// Configuration from which [`SubModel1`] is constructed.
    type Config: SubModelConfig;

    /// Output of the [`SubModel1`].
    type Output;

    /// Builds [`SubModel1`] with [`VarBuilder`] and [`SubModel1::Config`].
    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// A generalized forward function.
    fn forward(&self, xs: &Tensor) -> Result<Self::Output>;
}

/// Neural network model not owing its [`VarMap`] internally.
///
/// The difference from [`SubModel1`] is that this trait takes two inputs.
///
/// [`VarMap`]: candle_nn::VarMap
pub trait SubModel2 {
    /// Configuration from which [`SubModel2`] is constructed.
    type Config: SubModelConfig;

    /// Builds [`SubModel2`].
    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// A generalized forward function.
    fn forward(&self, x1: &Tensor, x2: &Tensor) -> Result<Tensor>;

    /// Returns a model sharing the parameters of `self` through which no
    /// gradient reaches the parameters.
    ///
    /// Gradients still flow back to the inputs.
    fn detach(&self) -> Self
    where
        Self: Sized;
}
