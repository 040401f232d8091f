//! Core types for the hierarchy model

mod ids;
mod member;

// Re-export all types
pub use ids::MemberId;
pub use member::{Member, MemberRecord, GROUP_FIELD};
