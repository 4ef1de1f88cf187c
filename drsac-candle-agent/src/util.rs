//! Utilities.
use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor, D};
use candle_nn::VarMap;
use drsac_core::error::DrsacError;
use log::trace;
use rand::Rng;
use rand_distr::StandardNormal;

/// Apply soft update on variables.
///
/// Variables are identified by their names.
///
/// dest = tau * src + (1.0 - tau) * dest
pub fn track(dest: &VarMap, src: &VarMap, tau: f64) -> Result<()> {
    track_with_replace_substring(dest, src, tau, ("", ""))
}

/// Apply soft update on variables whose names differ by a substring.
///
/// The variable `k` in `dest` is updated with the variable
/// `k.replace(ss_dest, ss_src)` in `src`.
pub fn track_with_replace_substring(
    dest: &VarMap,
    src: &VarMap,
    tau: f64,
    (ss_src, ss_dest): (&str, &str),
) -> Result<()> {
    trace!("dest");
    let dest = dest.data().lock().map_err(|e| anyhow!("{}", e))?;
    trace!("src");
    let src = src.data().lock().map_err(|e| anyhow!("{}", e))?;

    for (k_dest, v_dest) in dest.iter() {
        let k_src = match ss_dest.is_empty() {
            true => k_dest.clone(),
            false => k_dest.replace(ss_dest, ss_src),
        };
        let v_src = src
            .get(&k_src)
            .ok_or_else(|| anyhow!("Variable {} not found in the source", k_src))?;
        let t_dest = ((tau * v_src.as_tensor())? + (1.0 - tau) * v_dest.as_tensor())?;
        v_dest.set(&t_dest)?;
    }

    Ok(())
}

/// Interface for handling output dimensions.
pub trait OutDim {
    /// Returns the output dimension.
    fn get_out_dim(&self) -> i64;
}

/// Interface for handling input dimensions.
pub trait InDim {
    /// Returns the input dimension.
    fn get_in_dim(&self) -> i64;
}

/// `log(1 + exp(x))`, computed as `relu(x) + log(1 + exp(-|x|))`.
pub fn softplus(x: &Tensor) -> Result<Tensor> {
    Ok((x.relu()? + (x.abs()?.neg()?.exp()? + 1.0)?.log()?)?)
}

/// Log-sum-exp over the last dimension, keeping the dimension.
///
/// The maximum is subtracted before exponentiation and treated as a constant.
pub fn log_sum_exp(x: &Tensor) -> Result<Tensor> {
    let m = x.max_keepdim(D::Minus1)?.detach();
    let s = x.broadcast_sub(&m)?.exp()?.sum_keepdim(D::Minus1)?.log()?;
    Ok((s + m)?)
}

/// Returns the value of a scalar loss, or an error if it is NaN or infinite.
pub fn check_finite(loss: &Tensor, name: &str) -> Result<f32> {
    let v = loss.to_scalar::<f32>()?;
    match v.is_finite() {
        true => Ok(v),
        false => Err(DrsacError::NonFiniteLoss(name.to_string()).into()),
    }
}

/// Samples a `(rows, cols)` tensor from the standard normal distribution.
pub fn randn(rng: &mut impl Rng, (rows, cols): (usize, usize), device: &Device) -> Result<Tensor> {
    let v: Vec<f32> = (0..rows * cols)
        .map(|_| rng.sample::<f32, _>(StandardNormal))
        .collect();
    Ok(Tensor::from_vec(v, (rows, cols), device)?)
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::DType;
    use candle_nn::Init;

    fn varmap_with(t: &Tensor, name: &str) -> Result<VarMap> {
        let vm = VarMap::new();
        let init = Init::Randn {
            mean: 0.0,
            stdev: 1.0,
        };
        vm.get(t.dims(), name, init, DType::F32, &Device::Cpu)?;
        vm.data()
            .lock()
            .map_err(|e| anyhow!("{}", e))?
            .get(name)
            .ok_or_else(|| anyhow!("no var"))?
            .set(t)?;
        Ok(vm)
    }

    fn get(vm: &VarMap, name: &str) -> Result<Tensor> {
        Ok(vm
            .data()
            .lock()
            .map_err(|e| anyhow!("{}", e))?
            .get(name)
            .ok_or_else(|| anyhow!("no var"))?
            .as_tensor()
            .clone())
    }

    #[test]
    fn test_track() -> Result<()> {
        let tau = 0.7;
        let t_src = Tensor::from_slice(&[1.0f32, 2.0, 3.0], (3,), &Device::Cpu)?;
        let t_dest = Tensor::from_slice(&[4.0f32, 5.0, 6.0], (3,), &Device::Cpu)?;
        let t = ((tau * &t_src)? + (1.0 - tau) * &t_dest)?;

        let vm_src = varmap_with(&t_src, "var1")?;
        let vm_dest = varmap_with(&t_dest, "var1")?;
        track(&vm_dest, &vm_src, tau)?;

        let t_ = get(&vm_dest, "var1")?;
        assert!((t - t_)?.abs()?.sum(0)?.to_scalar::<f32>()? < 1e-5);

        Ok(())
    }

    #[test]
    fn test_track_with_replace_substring() -> Result<()> {
        let t_src = Tensor::from_slice(&[1.0f32, -2.0], (2,), &Device::Cpu)?;
        let t_dest = Tensor::from_slice(&[0.0f32, 0.0], (2,), &Device::Cpu)?;
        let vm_src = varmap_with(&t_src, "critic.ln0.weight")?;
        let vm_dest = varmap_with(&t_dest, "critic_tgt.ln0.weight")?;
        track_with_replace_substring(&vm_dest, &vm_src, 1.0, ("critic", "critic_tgt"))?;

        let t_ = get(&vm_dest, "critic_tgt.ln0.weight")?;
        assert_eq!(t_.to_vec1::<f32>()?, vec![1.0, -2.0]);

        Ok(())
    }

    #[test]
    fn test_soft_update_convergence() -> Result<()> {
        let tau = 0.005;
        let t_src = Tensor::from_slice(&[0.5f32, -1.0, 2.0, 0.0], (4,), &Device::Cpu)?;
        let t_dest = Tensor::from_slice(&[-3.0f32, 1.0, 0.0, 4.0], (4,), &Device::Cpu)?;
        let dist0 = (&t_dest - &t_src)?.sqr()?.sum_all()?.sqrt()?.to_scalar::<f32>()?;

        let vm_src = varmap_with(&t_src, "w")?;
        let vm_dest = varmap_with(&t_dest, "w")?;
        for n in 1..=500 {
            track(&vm_dest, &vm_src, tau)?;
            if n % 100 == 0 {
                let dist = (get(&vm_dest, "w")? - &t_src)?
                    .sqr()?
                    .sum_all()?
                    .sqrt()?
                    .to_scalar::<f32>()?;
                let bound = (1.0 - tau as f32).powi(n) * dist0;
                assert!(dist <= bound * 1.0001 + 1e-6, "{} > {}", dist, bound);
            }
        }

        Ok(())
    }

    #[test]
    fn test_softplus() -> Result<()> {
        let x = Tensor::from_slice(&[-100f32, -1.0, 0.0, 1.0, 100.0], (5,), &Device::Cpu)?;
        let y = softplus(&x)?.to_vec1::<f32>()?;
        let expected = [0.0f32, 0.313_261_7, std::f32::consts::LN_2, 1.313_261_7, 100.0];
        for (y, e) in y.iter().zip(expected.iter()) {
            assert!(y.is_finite());
            assert!((y - e).abs() < 1e-5, "{} != {}", y, e);
        }
        Ok(())
    }

    #[test]
    fn test_log_sum_exp() -> Result<()> {
        let x = Tensor::from_slice(&[1000f32, 1000.0, 0.0, 1.0], (2, 2), &Device::Cpu)?;
        let y = log_sum_exp(&x)?.to_vec2::<f32>()?;
        assert!((y[0][0] - (1000.0 + std::f32::consts::LN_2)).abs() < 1e-3);
        assert!((y[1][0] - (1f32.exp() + 1.0).ln()).abs() < 1e-5);
        Ok(())
    }

    #[test]
    fn test_check_finite() -> Result<()> {
        let x = Tensor::new(1.5f32, &Device::Cpu)?;
        assert_eq!(check_finite(&x, "x")?, 1.5);
        let x = Tensor::new(f32::NAN, &Device::Cpu)?;
        assert!(check_finite(&x, "x").is_err());
        Ok(())
    }
}
