//! Data models for the circulation server

pub mod activity;
pub mod claims;
pub mod enums;
pub mod lending;

// Re-export commonly used types
pub use activity::ActivityEntry;
pub use claims::UserClaims;
pub use enums::{ActivityAction, FineReason, ItemCondition, LendingStatus};
pub use lending::{LendingDetails, LendingRecord};
