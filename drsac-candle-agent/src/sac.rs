//! SAC agent.
mod actor;
mod base;
mod config;
mod critic;
mod ent_coef;
pub use actor::{squashed_gaussian_log_prob, GaussianActor, GaussianActorConfig};
pub use base::Sac;
pub use config::SacConfig;
pub use critic::{TwinCritic, TwinCriticConfig};
pub use ent_coef::{EntCoef, EntCoefMode};
