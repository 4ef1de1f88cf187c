//! Multilayer perceptron.
mod base;
mod config;
mod mlp2;
use anyhow::Result;
pub use base::Mlp;
use candle_core::{Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};
pub use config::MlpConfig;
pub use mlp2::Mlp2;

/// Returns linear layers `in_dim -> units[0] -> ... -> units[n-1]`,
/// followed by `units[n-1] -> out_dim` if `with_out` is `true`.
fn create_linear_layers(
    prefix: &str,
    vs: VarBuilder,
    config: &MlpConfig,
    with_out: bool,
) -> Result<Vec<Linear>> {
    let mut dims = vec![config.in_dim];
    dims.extend(config.units.iter());
    if with_out {
        dims.push(config.out_dim);
    }
    let vs = vs.pp(prefix);

    let mut layers = Vec::with_capacity(dims.len() - 1);
    for (i, w) in dims.windows(2).enumerate() {
        layers.push(linear(w[0] as _, w[1] as _, vs.pp(format!("ln{}", i)))?);
    }

    Ok(layers)
}

/// ReLU after every layer, except the last one if `relu_last` is `false`.
fn mlp_forward(xs: Tensor, layers: &[Linear], relu_last: bool) -> Result<Tensor> {
    let n_layers = layers.len();
    let mut xs = xs;

    for (i, layer) in layers.iter().enumerate() {
        xs = layer.forward(&xs)?;
        if i + 1 < n_layers || relu_last {
            xs = xs.relu()?;
        }
    }

    Ok(xs)
}

/// Returns a layer whose parameters are detached from the graph.
fn detach_linear(layer: &Linear) -> Linear {
    Linear::new(layer.weight().detach(), layer.bias().map(|b| b.detach()))
}
