pub mod cancel;
pub mod config;
pub mod types;

pub use cancel::CancelToken;
pub use config::{load_harvest_config, HarvestConfig};
