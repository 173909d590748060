pub mod observers;
pub mod step_registry;

pub use observers::{ObserverSet, StepObserver};
pub use step_registry::StepRegistry;
