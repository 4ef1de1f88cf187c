//! Runs a fixed number of episodes and reports the average return.
use super::Evaluator;
use crate::{error::DrsacError, record::Record, util::action_adapter, Env, Policy};
use anyhow::Result;

/// Runs `n_episodes` episodes on its own environment instance.
///
/// Episode `i` is reset with seed `seed + i`, so repeated evaluations see the
/// same initial states.
pub struct DefaultEvaluator<E: Env> {
    n_episodes: usize,
    seed: u64,
    env: E,
}

impl<E: Env> Evaluator for DefaultEvaluator<E> {
    fn evaluate<P: Policy>(&mut self, policy: &mut P) -> Result<Record> {
        let max_action = self.env.spec().max_action;
        let mut r_total = 0f32;

        for ix in 0..self.n_episodes {
            let (mut obs, _) = self.env.reset(self.seed + ix as u64)?;
            loop {
                let act = policy.sample(&obs)?;
                let step = self.env.step(&action_adapter(&act, max_action))?;
                r_total += step.reward;
                if step.is_done() {
                    break;
                }
                obs = step.obs;
            }
        }

        Ok(Record::from_scalar(
            "eval_return",
            r_total / self.n_episodes as f32,
        ))
    }
}

impl<E: Env> DefaultEvaluator<E> {
    /// Constructs a new [`DefaultEvaluator`].
    ///
    /// Fails with [`DrsacError::InvalidConfig`] if `n_episodes` is zero.
    pub fn new(config: &E::Config, seed: i64, n_episodes: usize) -> Result<Self> {
        if n_episodes == 0 {
            return Err(DrsacError::InvalidConfig(
                "n_episodes of the evaluator must be positive".to_string(),
            )
            .into());
        }

        Ok(Self {
            n_episodes,
            seed: seed as u64,
            env: E::build(config, seed)?,
        })
    }
}
