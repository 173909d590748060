pub mod data_point;
pub mod results;
pub mod sample;
pub mod step_event;
pub mod tasks;

pub use data_point::DataPoint;
pub use results::DailyTotal;
pub use sample::Sample;
pub use step_event::{StepCandidate, StepEvent};
pub use tasks::StorageTask;
