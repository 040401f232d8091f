//! McMafia chain-of-command model
//!
//! Builds a single ordered tree out of a flat, id-linked list of members and
//! supports two structural mutations on it:
//!
//! - **imprison**: take an active member out of the chain, handing its slot to
//!   the most senior sibling or, failing that, the most senior subordinate;
//! - **release**: put a jailed member back at its nearest surviving position,
//!   reclaiming the subordinates it had when it was jailed.
//!
//! On top of that it answers subordinate counts, levels and rankings, and can
//! render the active tree as indented text.
//!
//! ```
//! use mcmafia::{Hierarchy, MemberId, MemberRecord};
//!
//! let mut hierarchy = Hierarchy::from_records(vec![
//!     MemberRecord::new("boss").with_children(["ub1", "ub2"]),
//!     MemberRecord::new("ub1").with_parent("boss").with_children(["soldier"]),
//!     MemberRecord::new("ub2").with_parent("boss"),
//!     MemberRecord::new("soldier").with_parent("ub1"),
//! ])?;
//!
//! hierarchy.imprison(&MemberId::from("ub1"))?;
//! assert_eq!(hierarchy.subordinate_count(&MemberId::from("ub2"))?, 1);
//!
//! hierarchy.release(&MemberId::from("ub1"))?;
//! assert_eq!(hierarchy.subordinate_count(&MemberId::from("ub1"))?, 1);
//! # Ok::<(), mcmafia::HierarchyError>(())
//! ```
//!
//! The model performs no I/O. [`HierarchyService`] drives it against any
//! [`MemberSource`].

pub mod error;
pub mod hierarchy;
pub mod queries;
pub mod service;
pub mod source;
pub mod tree;
pub mod types;

pub use error::{
    ErrorSeverity, HierarchyError, Result, ServiceError, ServiceResult, Severity,
};
pub use hierarchy::{Hierarchy, LastKnownPosition};
pub use queries::Ranking;
pub use service::HierarchyService;
pub use source::{group_of, organization_members, upsert, InMemoryMemberSource, MemberSource};
pub use tree::{FlatNode, Node, NodePayload, Tree};
pub use types::{Member, MemberId, MemberRecord, GROUP_FIELD};
