//! Train [`Agent`].
mod config;
use crate::{
    error::DrsacError,
    record::{
        Record,
        RecordValue::{DateTime, Scalar},
        Recorder,
    },
    util::action_adapter,
    Agent, Env, Evaluator, ExperienceBufferBase, ReplayBufferBase, Transition,
};
use anyhow::Result;
use chrono::Local;
pub use config::TrainerConfig;
use log::{info, warn};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{marker::PhantomData, path::Path};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the training loop.
///
/// # Training loop
///
/// 1. Build the environment, the replay buffer and reset the counters.
/// 2. Reset the environment with seed `seed + (number of episodes so far)`.
/// 3. Take an action: uniformly random in `[-1, 1]` during the warmup period,
///    sampled from the agent otherwise. Scale it to the environment range with
///    [`action_adapter`] and do an environment step.
/// 4. Push the transition into the replay buffer. Its terminal flag is
///    `is_terminated` only; truncated episodes still bootstrap.
/// 5. `env_steps += 1`. After the warmup period, if `env_steps % opt_interval == 0`,
///    run `opt_interval` optimization steps of the agent.
/// 6. If `env_steps % eval_interval == 0`, evaluate the agent in evaluation mode.
///    The best model so far is saved in `(model_dir)/best`.
/// 7. If `env_steps % save_interval == 0`, save the agent in `(model_dir)/(env_steps)`.
/// 8. Back to 3 until the episode ends, then to 2 until `max_env_steps`.
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|action|B[Env]
///     B -->|observation, reward|A
///     B -->|Transition|D[ReplayBuffer]
///     D -->|Batch|A
/// ```
pub struct Trainer<E, R>
where
    E: Env,
    R: ExperienceBufferBase<Item = Transition> + ReplayBufferBase,
{
    env_config_train: E::Config,
    replay_buffer_config: R::Config,
    config: TrainerConfig,
    phantom: PhantomData<(E, R)>,
}

impl<E, R> Trainer<E, R>
where
    E: Env,
    R: ExperienceBufferBase<Item = Transition> + ReplayBufferBase,
{
    /// Constructs a trainer.
    pub fn build(
        config: TrainerConfig,
        env_config_train: E::Config,
        replay_buffer_config: R::Config,
    ) -> Result<Self> {
        if config.opt_interval == 0 {
            return Err(DrsacError::InvalidConfig("opt_interval must be positive".into()).into());
        }
        Ok(Self {
            env_config_train,
            replay_buffer_config,
            config,
            phantom: PhantomData,
        })
    }

    fn save_model<A: Agent<R>>(agent: &A, model_dir: &Path) {
        match agent.save_params(model_dir) {
            Ok(_) => info!("Saved the model in {:?}", model_dir),
            Err(e) => warn!("Failed to save model in {:?}: {}", model_dir, e),
        }
    }

    fn is_interval(step: usize, interval: usize) -> bool {
        interval > 0 && step % interval == 0
    }

    /// Trains the agent and returns the replay buffer filled during training.
    pub fn train<A, D>(
        &mut self,
        agent: &mut A,
        recorder: &mut dyn Recorder,
        evaluator: &mut D,
    ) -> Result<R>
    where
        A: Agent<R>,
        D: Evaluator,
    {
        let config = &self.config;
        let mut env = E::build(&self.env_config_train, config.seed)?;
        let spec = env.spec();
        let mut buffer = R::build(&self.replay_buffer_config)?;
        let mut rng = StdRng::seed_from_u64(config.seed as u64);
        let mut env_seed = config.seed as u64;
        let mut max_eval_return = f32::MIN;
        let mut env_steps: usize = 0;
        let mut opt_steps: usize = 0;
        let mut episodes: usize = 0;
        agent.train();

        info!(
            "Start training: state_dim = {}, action_dim = {}, max_action = {}",
            spec.state_dim, spec.action_dim, spec.max_action
        );

        while env_steps < config.max_env_steps {
            let (mut obs, _) = env.reset(env_seed)?;
            env_seed += 1;
            episodes += 1;
            let mut episode_return = 0f32;

            loop {
                let act = if env_steps < config.warmup_period {
                    (0..spec.action_dim)
                        .map(|_| rng.gen_range(-1f32..=1f32))
                        .collect()
                } else {
                    agent.sample(&obs)?
                };
                let step = env.step(&action_adapter(&act, spec.max_action))?;
                episode_return += step.reward;
                let is_done = step.is_done();
                buffer.push(Transition {
                    obs,
                    act,
                    reward: step.reward,
                    next_obs: step.obs.clone(),
                    done: step.is_terminated,
                })?;
                obs = step.obs;
                env_steps += 1;

                // Optimization steps
                if env_steps >= config.warmup_period && env_steps % config.opt_interval == 0 {
                    for _ in 0..config.opt_interval {
                        let mut record = agent.opt_with_record(&mut buffer)?;
                        opt_steps += 1;
                        record.insert("opt_steps", Scalar(opt_steps as _));
                        recorder.store(record);
                    }
                    recorder.flush(env_steps as _);
                }

                // Evaluation
                if Self::is_interval(env_steps, config.eval_interval) {
                    agent.eval();
                    let eval_return = evaluator.evaluate(agent)?.get_scalar("eval_return")?;
                    agent.train();
                    info!("env_steps = {}, eval_return = {}", env_steps, eval_return);
                    let mut record = Record::from_scalar("eval_return", eval_return);
                    record.insert("env_steps", Scalar(env_steps as _));
                    recorder.write(record);

                    if eval_return > max_eval_return {
                        max_eval_return = eval_return;
                        if let Some(model_dir) = &config.model_dir {
                            Self::save_model(agent, &Path::new(model_dir).join("best"));
                        }
                    }
                }

                // Save the current model
                if Self::is_interval(env_steps, config.save_interval) {
                    if let Some(model_dir) = &config.model_dir {
                        let path = Path::new(model_dir).join(format!("{}", env_steps));
                        Self::save_model(agent, &path);
                    }
                }

                if is_done || env_steps >= config.max_env_steps {
                    break;
                }
            }

            let mut record = Record::from_scalar("episode_return", episode_return);
            record.insert("episodes", Scalar(episodes as _));
            record.insert("env_steps", Scalar(env_steps as _));
            record.insert("datetime", DateTime(Local::now()));
            recorder.write(record);
        }

        info!(
            "Finished training: {} environment steps, {} optimization steps, {} episodes",
            env_steps, opt_steps, episodes
        );

        Ok(buffer)
    }
}
