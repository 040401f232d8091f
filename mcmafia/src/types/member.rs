//! Member types: the flat record exchanged with callers and the payload held by tree nodes

use super::ids::MemberId;
use crate::tree::NodePayload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Payload field that groups members into one organization
pub const GROUP_FIELD: &str = "organization";

/// Flat, reference-based member record
///
/// This is the shape callers persist. Structural links are carried as ids;
/// anything the hierarchy does not interpret lives in `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    pub id: MemberId,

    /// Immediate superior, `None` for the group's root
    #[serde(default, alias = "parentId")]
    pub parent: Option<MemberId>,

    /// Immediate subordinates in order
    #[serde(default, alias = "childIds")]
    pub children: Vec<MemberId>,

    /// Incapacitated ("in jail") flag
    #[serde(default, rename = "jail", alias = "incapacitated")]
    pub incapacitated: bool,

    /// Seniority timestamp used to pick replacements
    #[serde(
        default,
        rename = "startedAt",
        alias = "started_at",
        skip_serializing_if = "Option::is_none"
    )]
    pub started_at: Option<DateTime<Utc>>,

    /// Opaque domain fields (name, organization, role, ...)
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl MemberRecord {
    /// Create an active, parentless record with no subordinates
    pub fn new(id: impl Into<MemberId>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            children: Vec::new(),
            incapacitated: false,
            started_at: None,
            fields: Map::new(),
        }
    }

    /// Set the parent
    pub fn with_parent(mut self, parent: impl Into<MemberId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    /// Set the ordered children
    pub fn with_children<I, T>(mut self, children: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<MemberId>,
    {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    /// Mark the record as incapacitated
    pub fn jailed(mut self) -> Self {
        self.incapacitated = true;
        self
    }

    /// Set the seniority timestamp
    pub fn with_started_at(mut self, started_at: DateTime<Utc>) -> Self {
        self.started_at = Some(started_at);
        self
    }

    /// Set an opaque payload field
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Grouping key, if the record carries one
    pub fn group(&self) -> Option<&str> {
        self.fields.get(GROUP_FIELD).and_then(Value::as_str)
    }

    /// Split into the node payload and its structural links
    pub fn into_parts(self) -> (Member, Option<MemberId>, Vec<MemberId>) {
        let member = Member {
            id: self.id,
            incapacitated: self.incapacitated,
            started_at: self.started_at,
            fields: self.fields,
        };
        (member, self.parent, self.children)
    }

    /// Reassemble a record from a payload and its structural links
    pub fn from_parts(member: Member, parent: Option<MemberId>, children: Vec<MemberId>) -> Self {
        Self {
            id: member.id,
            parent,
            children,
            incapacitated: member.incapacitated,
            started_at: member.started_at,
            fields: member.fields,
        }
    }
}

/// Domain payload carried by a hierarchy node
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub id: MemberId,
    pub incapacitated: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub fields: Map<String, Value>,
}

impl Member {
    /// Human readable label: the id, or the named payload field when present
    pub fn label(&self, field: &str) -> String {
        if field == "id" {
            return self.id.to_string();
        }
        match self.fields.get(field) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => self.id.to_string(),
            Some(other) => other.to_string(),
        }
    }

    /// Seniority sort key: dated members first, earliest first
    pub(crate) fn seniority(&self) -> (bool, Option<DateTime<Utc>>) {
        (self.started_at.is_none(), self.started_at)
    }
}

impl NodePayload for Member {
    type Id = MemberId;

    fn id(&self) -> &MemberId {
        &self.id
    }
}
