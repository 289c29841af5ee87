pub mod classify;
pub mod core;
pub mod driver;
pub mod extract;
pub mod salary;
pub mod scraping;
pub mod store;

// --- Primary exports ---
pub use crate::core::types;
pub use crate::core::types::{HarvestError, HarvestReport, JobPosting, RequiredFields, SaveReport};
pub use crate::core::{load_harvest_config, CancelToken, HarvestConfig};
pub use driver::HarvestRunner;
pub use salary::{parse_range, SalaryRange};
pub use scraping::{ChallengeState, Clearance, ScrapeSession};
pub use store::{JobStore, JsonFileStore, MemoryStore, PersistenceGate};
