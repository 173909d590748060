//! Step counting from a live accelerometer stream.
//!
//! Readings flow from a [`sensor::SensorSource`] through the
//! [`detector::StepDetector`] into the [`registry::StepRegistry`], which keeps
//! today's total, checkpoints it to a [`database::StepStore`] and notifies
//! observers. [`StepCounter`] ties these together.

pub mod calendar;
pub mod config;
pub mod counter;
pub mod database;
pub mod detector;
pub mod logger;
pub mod registry;
pub mod sensor;
pub mod types;
pub mod utils;

pub use counter::{CounterError, StepCounter};
pub use types::{DataPoint, StepEvent};
