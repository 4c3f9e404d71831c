pub mod assembler;
pub mod estimator;
pub mod timeline;

pub use assembler::{AssembleError, AssemblerOptions, PresentedEvent, PresentedTrackingRecord, TrackingAssembler};
pub use estimator::EstimatorOptions;
