//! Error types for hierarchy operations
//!
//! Every error is a synchronous, caller-correctable precondition failure.
//! Nothing in the model retries or logs; callers decide how to surface each
//! kind, usually by looking at its [`Severity`].

use thiserror::Error;

/// Result type for the pure hierarchy model
pub type Result<T> = std::result::Result<T, HierarchyError>;

/// Result type for operations that go through a [`crate::MemberSource`]
pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Severity levels for error classification
///
/// - **Warning**: the operation can proceed, but something looks off.
/// - **Error**: the requested operation was rejected; the data is intact.
/// - **Critical**: the input or a collaborator is broken and needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Potential issue but operation can proceed
    Warning,
    /// Operation failed but the caller can correct and retry
    Error,
    /// Structural corruption or an unavailable collaborator
    Critical,
}

/// Trait for error types that have severity levels
pub trait Severity {
    /// Classify this error
    fn severity(&self) -> ErrorSeverity;
}

/// Errors raised while building or mutating a hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HierarchyError {
    /// A record references a parent or child that is not in the input
    #[error("There is a reference to a non existing member: {id}")]
    DanglingReference { id: String },

    /// Zero or several active members have no parent
    #[error("expected exactly one active member without a parent, found {count}")]
    MissingOrAmbiguousRoot { count: usize },

    /// The id is not in the partition the operation works on
    #[error("member not found: {id}")]
    UnknownMember { id: String },

    /// Imprison targeted a member with neither a sibling nor a child
    #[error("There is no current replacement for member: {id}")]
    NoReplacement { id: String },

    /// A node was asked to become its own parent or child
    #[error("node {id} can not reference itself")]
    SelfReference { id: String },

    /// Detach targeted a node that is not a current child
    #[error("node {child} is not a current child of {parent}")]
    NotAChild { parent: String, child: String },

    /// The same id appears more than once
    #[error("duplicate member id: {id}")]
    DuplicateMember { id: String },

    /// An active record links to an incapacitated member as a live edge
    #[error("incapacitated member {id} is linked into the active chain")]
    IncapacitatedInActiveChain { id: String },

    /// A parent lists a child whose own record names another parent
    #[error("member {child} is listed under {parent} but reports a different parent")]
    InconsistentEdge { parent: String, child: String },

    /// An active member can not be reached from the root
    #[error("active member {id} is not reachable from the root")]
    DetachedMember { id: String },
}

impl HierarchyError {
    pub(crate) fn unknown(id: impl ToString) -> Self {
        Self::UnknownMember { id: id.to_string() }
    }

    pub(crate) fn dangling(id: impl ToString) -> Self {
        Self::DanglingReference { id: id.to_string() }
    }
}

impl Severity for HierarchyError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            HierarchyError::UnknownMember { .. } => ErrorSeverity::Error,
            HierarchyError::NoReplacement { .. } => ErrorSeverity::Error,
            HierarchyError::DuplicateMember { .. } => ErrorSeverity::Error,

            // Broken input snapshot
            HierarchyError::DanglingReference { .. } => ErrorSeverity::Critical,
            HierarchyError::MissingOrAmbiguousRoot { .. } => ErrorSeverity::Critical,
            HierarchyError::IncapacitatedInActiveChain { .. } => ErrorSeverity::Critical,
            HierarchyError::InconsistentEdge { .. } => ErrorSeverity::Critical,
            HierarchyError::DetachedMember { .. } => ErrorSeverity::Critical,

            // Primitive misuse
            HierarchyError::SelfReference { .. } => ErrorSeverity::Critical,
            HierarchyError::NotAChild { .. } => ErrorSeverity::Critical,
        }
    }
}

/// Errors raised by [`crate::HierarchyService`]
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The hierarchy rejected the operation
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// The member source has no record for this id
    #[error("member not found in source: {id}")]
    MemberNotFound { id: String },

    /// Two members that must share a group do not
    #[error("members {first} and {second} belong to different groups")]
    GroupMismatch { first: String, second: String },

    /// The member source failed
    #[error("member source error: {0}")]
    Source(String),
}

impl ServiceError {
    /// Create a new source error
    pub fn source_error(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }
}

impl Severity for ServiceError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            ServiceError::Hierarchy(err) => err.severity(),
            ServiceError::MemberNotFound { .. } => ErrorSeverity::Error,
            ServiceError::GroupMismatch { .. } => ErrorSeverity::Error,
            ServiceError::Source(_) => ErrorSeverity::Critical,
        }
    }
}
