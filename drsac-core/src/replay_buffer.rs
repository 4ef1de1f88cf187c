//! A fixed-capacity circular replay buffer.
mod base;
mod batch;
mod config;
pub use base::{SimpleReplayBuffer, Transition};
pub use batch::StdBatch;
pub use config::SimpleReplayBufferConfig;
