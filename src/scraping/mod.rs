pub mod browser;
pub mod challenge;
pub mod humanize;
pub mod stealth;

pub use browser::ScrapeSession;
pub use challenge::{ChallengeState, Clearance};
