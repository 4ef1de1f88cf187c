//! Records of training metrics and the recorders consuming them.
//!
//! An optimization step of an agent, an evaluation run and the training loop
//! itself all report what happened as a [`Record`], a map from names to
//! [`RecordValue`]s. Records are handed to a [`Recorder`], which decides what
//! to do with them.
//!
//! ```rust
//! use drsac_core::record::{Record, RecordValue};
//!
//! let mut record = Record::from_scalar("loss_critic", 0.25);
//! record.insert("env_steps", RecordValue::Scalar(1000.0));
//! assert_eq!(record.get_scalar("loss_critic").unwrap(), 0.25);
//! ```
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
