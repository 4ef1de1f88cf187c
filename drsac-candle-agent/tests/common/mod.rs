//! Environment and agent shared by the integration tests.
#![allow(dead_code)]
use anyhow::Result;
use drsac_candle_agent::{
    mlp::{Mlp, Mlp2, MlpConfig},
    opt::OptimizerConfig,
    sac::{EntCoefMode, GaussianActorConfig, Sac, SacConfig, TwinCriticConfig},
    Device,
};
use drsac_core::{
    replay_buffer::{SimpleReplayBuffer, SimpleReplayBufferConfig},
    Env, EnvSpec, Step,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

pub const DIM_OBS: usize = 2;
pub const DIM_ACT: usize = 2;
pub const EPISODE_LEN: usize = 5;
pub const LR_ACTOR: f64 = 0.001;
pub const LR_CRITIC: f64 = 0.001;
pub const DISCOUNT_FACTOR: f64 = 0.5;
pub const BATCH_SIZE: usize = 64;
pub const UNITS: [i64; 2] = [64, 64];
pub const REPLAY_BUFFER_CAPACITY: usize = 10_000;

pub type Agent = Sac<Mlp, Mlp2, SimpleReplayBuffer>;

#[derive(Debug, Clone)]
pub struct ToyEnvConfig {
    pub episode_len: usize,
}

impl Default for ToyEnvConfig {
    fn default() -> Self {
        Self {
            episode_len: EPISODE_LEN,
        }
    }
}

/// The observation is a target point in `[-0.5, 0.5]^2`, redrawn every step.
/// The reward is the negative squared distance between the action and the target.
pub struct ToyEnv {
    episode_len: usize,
    t: usize,
    target: Vec<f32>,
    rng: StdRng,
}

impl ToyEnv {
    fn draw_target(&mut self) -> Vec<f32> {
        self.target = (0..DIM_OBS)
            .map(|_| self.rng.gen_range(-0.5f32..=0.5))
            .collect();
        self.target.clone()
    }
}

impl Env for ToyEnv {
    type Config = ToyEnvConfig;
    type Info = ();

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        Ok(Self {
            episode_len: config.episode_len,
            t: 0,
            target: vec![0.0; DIM_OBS],
            rng: StdRng::seed_from_u64(seed as u64),
        })
    }

    fn spec(&self) -> EnvSpec {
        EnvSpec {
            state_dim: DIM_OBS,
            action_dim: DIM_ACT,
            max_action: 1.0,
            max_episode_steps: self.episode_len,
        }
    }

    fn reset(&mut self, seed: u64) -> Result<(Vec<f32>, ())> {
        self.rng = StdRng::seed_from_u64(seed);
        self.t = 0;
        Ok((self.draw_target(), ()))
    }

    fn step(&mut self, act: &[f32]) -> Result<Step<Self>> {
        let reward = -act
            .iter()
            .zip(self.target.iter())
            .map(|(a, t)| (a - t) * (a - t))
            .sum::<f32>();
        self.t += 1;
        let obs = self.draw_target();
        let is_truncated = self.t >= self.episode_len;
        Ok(Step::new(obs, act.to_vec(), reward, false, is_truncated, ()))
    }
}

pub fn create_agent_config() -> SacConfig<Mlp, Mlp2> {
    let actor_config = GaussianActorConfig::default()
        .opt_config(OptimizerConfig::Adam { lr: LR_ACTOR })
        .policy_config(MlpConfig::new(
            DIM_OBS as _,
            UNITS.to_vec(),
            DIM_ACT as _,
            false,
        ));
    let critic_config = TwinCriticConfig::default()
        .opt_config(OptimizerConfig::Adam { lr: LR_CRITIC })
        .q_config(MlpConfig::new(
            (DIM_OBS + DIM_ACT) as _,
            UNITS.to_vec(),
            1,
            false,
        ));

    SacConfig::default()
        .dims(DIM_OBS, DIM_ACT)
        .actor_config(actor_config)
        .critic_config(critic_config)
        .discount_factor(DISCOUNT_FACTOR)
        .batch_size(BATCH_SIZE)
        .ent_coef_mode(EntCoefMode::Auto(0.1, 0.001))
        .device(Device::Cpu)
}

pub fn create_replay_buffer_config(seed: u64) -> SimpleReplayBufferConfig {
    SimpleReplayBufferConfig::default()
        .capacity(REPLAY_BUFFER_CAPACITY)
        .state_dim(DIM_OBS)
        .action_dim(DIM_ACT)
        .seed(seed)
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn mean(xs: &[f32]) -> f32 {
    xs.iter().sum::<f32>() / xs.len() as f32
}
