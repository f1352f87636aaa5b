// Detection Pipeline
// normalizer and heuristic are pure; orchestrator runs the fallback chain
// for one image; aggregation fans the chain out over video frames.

pub mod aggregation;
pub mod features;
pub mod heuristic;
pub mod normalizer;
pub mod orchestrator;

pub use aggregation::{aggregate_frames, MAX_FRAMES};
pub use features::FeatureJitter;
pub use orchestrator::{classify_frame, HEURISTIC_SOURCE};
