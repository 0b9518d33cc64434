//! Types and traits for recording training metrics and environment info.
//!
//! * [`Record`] - A container for storing key-value pairs of various data types
//! * [`RecordValue`] - An enum representing different types of values that can be stored
//! * [`Recorder`] - A trait defining the interface for recording and storing data
//! * [`RecordStorage`] - A storage system with aggregation capabilities
//! * [`BufferedRecorder`] - A recorder that keeps records in memory
//! * [`NullRecorder`] - A recorder that discards all records
//!
//! # Basic Usage
//!
//! ```rust
//! use paddock_core::record::{Record, RecordValue};
//!
//! let mut record = Record::empty();
//! record.insert("num_timesteps", RecordValue::Scalar(1000.0));
//! record.insert("loss", RecordValue::Scalar(0.25));
//! record.insert("obs", RecordValue::Array1(vec![0.1, 0.2]));
//! ```
//!
//! The [`Trainer`](crate::Trainer) stores records of optimization steps and episode
//! statistics with [`Recorder::store`] and aggregates them with [`Recorder::flush`].
mod base;
mod buffered_recorder;
mod null_recorder;
mod recorder;
mod storage;

pub use base::{Record, RecordValue};
pub use buffered_recorder::BufferedRecorder;
pub use null_recorder::NullRecorder;
pub use recorder::Recorder;
pub use storage::RecordStorage;
