#![warn(missing_docs)]
//! Core of a soft actor-critic library with a distributionally robust reward backup.
//!
//! This crate is independent of any tensor library. It defines the interfaces
//! between environments, agents and replay buffers, a circular replay buffer,
//! and the loop driving the training.
pub mod error;
pub mod record;
pub mod replay_buffer;
pub mod util;
pub mod wrapper;

#[cfg(test)]
mod dummy;

mod base;
pub use base::{
    Agent, Configurable, Env, EnvSpec, ExperienceBufferBase, Info, Policy, ReplayBufferBase, Step,
    TransitionBatch,
};
pub use replay_buffer::Transition;

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};

mod trainer;
pub use trainer::{Trainer, TrainerConfig};
