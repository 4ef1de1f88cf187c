use super::{SimpleReplayBufferConfig, StdBatch};
use crate::{error::DrsacError, ExperienceBufferBase, ReplayBufferBase};
use anyhow::Result;
use rand::{rngs::StdRng, Rng, SeedableRng};

/// A transition `(s, a, r, s', done)`.
///
/// `done` is `true` only when the episode reached a terminal state;
/// truncated episodes are stored with `done == false`.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// Observation.
    pub obs: Vec<f32>,

    /// Action in `[-1, 1]`.
    pub act: Vec<f32>,

    /// Reward.
    pub reward: f32,

    /// Next observation.
    pub next_obs: Vec<f32>,

    /// Terminal flag.
    pub done: bool,
}

/// A fixed-capacity circular replay buffer.
///
/// Storage is allocated once at construction. Once full, each new transition
/// overwrites the oldest one.
pub struct SimpleReplayBuffer {
    capacity: usize,
    state_dim: usize,
    action_dim: usize,
    ptr: usize,
    size: usize,
    obs: Vec<f32>,
    act: Vec<f32>,
    reward: Vec<f32>,
    next_obs: Vec<f32>,
    is_terminated: Vec<i8>,
    rng: StdRng,
}

impl SimpleReplayBuffer {
    /// Adds a transition.
    ///
    /// Use [`ExperienceBufferBase::push`] to get an error instead of a panic
    /// on a malformed transition.
    ///
    /// # Panics
    ///
    /// Panics if the length of `s`, `a` or `s_next` differs from the
    /// dimension given in the configuration.
    pub fn add(&mut self, s: &[f32], a: &[f32], r: f32, s_next: &[f32], done: bool) {
        assert_eq!(s.len(), self.state_dim, "length of obs");
        assert_eq!(a.len(), self.action_dim, "length of act");
        assert_eq!(s_next.len(), self.state_dim, "length of next_obs");

        let (i, ds, da) = (self.ptr, self.state_dim, self.action_dim);
        self.obs[i * ds..(i + 1) * ds].copy_from_slice(s);
        self.act[i * da..(i + 1) * da].copy_from_slice(a);
        self.reward[i] = r;
        self.next_obs[i * ds..(i + 1) * ds].copy_from_slice(s_next);
        self.is_terminated[i] = done as i8;

        self.ptr = (self.ptr + 1) % self.capacity;
        self.size = (self.size + 1).min(self.capacity);
    }

    /// Returns the transition stored at `ix`, if `ix < len()`.
    pub fn get(&self, ix: usize) -> Option<Transition> {
        if ix >= self.size {
            return None;
        }
        let (ds, da) = (self.state_dim, self.action_dim);
        Some(Transition {
            obs: self.obs[ix * ds..(ix + 1) * ds].to_vec(),
            act: self.act[ix * da..(ix + 1) * da].to_vec(),
            reward: self.reward[ix],
            next_obs: self.next_obs[ix * ds..(ix + 1) * ds].to_vec(),
            done: self.is_terminated[ix] == 1,
        })
    }

    /// Returns the maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the position where the next transition is written.
    pub fn ptr(&self) -> usize {
        self.ptr
    }

    /// Draws `batch_size` transitions uniformly at random with replacement.
    ///
    /// Equivalent to [`ReplayBufferBase::batch`].
    pub fn sample(&mut self, batch_size: usize) -> Result<StdBatch> {
        self.batch(batch_size)
    }

    fn gather(src: &[f32], dim: usize, ixs: &[usize]) -> Vec<f32> {
        let mut dst = Vec::with_capacity(ixs.len() * dim);
        for &ix in ixs.iter() {
            dst.extend_from_slice(&src[ix * dim..(ix + 1) * dim]);
        }
        dst
    }

    fn check_dim(name: &str, expected: usize, actual: usize) -> Result<()> {
        if expected != actual {
            return Err(DrsacError::DimensionMismatch {
                name: name.to_string(),
                expected,
                actual,
            }
            .into());
        }
        Ok(())
    }
}

impl ExperienceBufferBase for SimpleReplayBuffer {
    type Item = Transition;

    fn len(&self) -> usize {
        self.size
    }

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        Self::check_dim("obs", self.state_dim, tr.obs.len())?;
        Self::check_dim("act", self.action_dim, tr.act.len())?;
        Self::check_dim("next_obs", self.state_dim, tr.next_obs.len())?;
        self.add(&tr.obs, &tr.act, tr.reward, &tr.next_obs, tr.done);
        Ok(())
    }
}

impl ReplayBufferBase for SimpleReplayBuffer {
    type Config = SimpleReplayBufferConfig;
    type Batch = StdBatch;

    fn build(config: &Self::Config) -> Result<Self> {
        if config.capacity == 0 || config.state_dim == 0 || config.action_dim == 0 {
            return Err(DrsacError::InvalidConfig(format!(
                "capacity, state_dim and action_dim must be positive: {:?}",
                config
            ))
            .into());
        }
        let capacity = config.capacity;

        Ok(Self {
            capacity,
            state_dim: config.state_dim,
            action_dim: config.action_dim,
            ptr: 0,
            size: 0,
            obs: vec![0.; capacity * config.state_dim],
            act: vec![0.; capacity * config.action_dim],
            reward: vec![0.; capacity],
            next_obs: vec![0.; capacity * config.state_dim],
            is_terminated: vec![0; capacity],
            rng: StdRng::seed_from_u64(config.seed),
        })
    }

    fn batch(&mut self, size: usize) -> Result<Self::Batch> {
        if self.size == 0 {
            return Err(DrsacError::EmptyReplayBuffer.into());
        }

        let ixs = (0..size)
            .map(|_| self.rng.gen_range(0..self.size))
            .collect::<Vec<_>>();

        Ok(StdBatch {
            obs: Self::gather(&self.obs, self.state_dim, &ixs),
            act: Self::gather(&self.act, self.action_dim, &ixs),
            next_obs: Self::gather(&self.next_obs, self.state_dim, &ixs),
            reward: ixs.iter().map(|&ix| self.reward[ix]).collect(),
            is_terminated: ixs.iter().map(|&ix| self.is_terminated[ix]).collect(),
            ix_sample: ixs,
            obs_dim: self.state_dim,
            act_dim: self.action_dim,
        })
    }
}
