// Services module

pub mod config_store;
pub mod detection;
pub mod media;
pub mod providers;
pub mod registry;

pub use providers::{ClassifierBackend, ClassifierClient};
pub use registry::SourceRegistry;
