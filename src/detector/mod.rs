//! On-device step detection: sliding window, walking classification, peak
//! detection and step validation.

pub mod buffer;
pub mod classifier;
pub mod peak;
pub mod pipeline;
pub mod simple;
pub mod validator;

pub use buffer::SampleBuffer;
pub use classifier::{WalkingClassifier, WindowAnalysis};
pub use peak::PeakDetector;
pub use pipeline::{SampleError, StepDetector};
pub use simple::SimpleDetector;
pub use validator::{Rejection, StepValidator, Verdict};
