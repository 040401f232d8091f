//! High-level operations driven against a member source
//!
//! Every call fetches one group, builds a fresh [`Hierarchy`], applies a single
//! operation and, for mutations, writes the flattened group back. Concurrent
//! writers to the same group must be serialized by the caller.

use crate::error::{HierarchyError, ServiceError, ServiceResult};
use crate::hierarchy::Hierarchy;
use crate::queries::Ranking;
use crate::source::{upsert, MemberSource};
use crate::types::{MemberId, MemberRecord, GROUP_FIELD};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Service for hierarchy queries and mutations
pub struct HierarchyService<S> {
    source: S,
}

impl<S: MemberSource> HierarchyService<S> {
    /// Create a service over the given source
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Build the hierarchy of `id`'s group
    pub async fn load(&self, id: &MemberId) -> ServiceResult<Hierarchy> {
        let records = self.source.fetch_group(id).await?;
        debug!(member = %id, size = records.len(), "Fetched group");
        Ok(Hierarchy::from_records(records)?)
    }

    /// Every record in `id`'s group, as stored
    pub async fn members(&self, id: &MemberId) -> ServiceResult<Vec<MemberRecord>> {
        self.source.fetch_group(id).await
    }

    /// Every record of a named organization; `None` lists the ungrouped members
    pub async fn organization(&self, name: Option<&str>) -> ServiceResult<Vec<MemberRecord>> {
        self.source.fetch_organization(name).await
    }

    /// Upsert arbitrary records, keeping every touched organization buildable
    ///
    /// Records are merged into what each affected organization already holds,
    /// including organizations a record moves away from. Nothing is written
    /// unless every resulting organization builds a valid [`Hierarchy`].
    pub async fn import(&self, records: Vec<MemberRecord>) -> ServiceResult<Vec<MemberRecord>> {
        let mut incoming: HashMap<MemberId, Option<String>> = HashMap::new();
        let mut affected: IndexSet<Option<String>> = IndexSet::new();
        for record in &records {
            let group = record.group().map(str::to_owned);
            if incoming.insert(record.id.clone(), group.clone()).is_some() {
                return Err(HierarchyError::DuplicateMember {
                    id: record.id.to_string(),
                }
                .into());
            }
            affected.insert(group);
            if let Some(stored) = self.source.find_member(&record.id).await? {
                affected.insert(stored.group().map(str::to_owned));
            }
        }

        let mut by_group: IndexMap<Option<String>, Vec<MemberRecord>> = IndexMap::new();
        for record in &records {
            by_group
                .entry(record.group().map(str::to_owned))
                .or_default()
                .push(record.clone());
        }

        for group in &affected {
            let mut merged: Vec<MemberRecord> = self
                .source
                .fetch_organization(group.as_deref())
                .await?
                .into_iter()
                .filter(|r| incoming.get(&r.id).map_or(true, |g| g == group))
                .collect();
            if let Some(arriving) = by_group.get(group) {
                upsert(&mut merged, arriving);
            }
            if merged.is_empty() {
                continue;
            }
            if let Err(e) = Hierarchy::from_records(merged) {
                warn!(organization = ?group, error = %e, "Import rejected");
                return Err(e.into());
            }
        }

        let saved = self.source.save_group(records).await?;
        info!(
            count = saved.len(),
            organizations = affected.len(),
            "Imported members"
        );
        Ok(saved)
    }

    /// Number of people under an active member
    pub async fn subordinates(&self, id: &MemberId) -> ServiceResult<usize> {
        Ok(self.load(id).await?.subordinate_count(id)?)
    }

    /// Distance of an active member from the root
    pub async fn level(&self, id: &MemberId) -> ServiceResult<usize> {
        Ok(self.load(id).await?.level(id)?)
    }

    /// Compare two members of the same group
    pub async fn rank(&self, a: &MemberId, b: &MemberId) -> ServiceResult<Ranking> {
        let first = self.require(a).await?;
        let second = self.require(b).await?;
        if first.group() != second.group() {
            warn!(first = %a, second = %b, "Rank across groups rejected");
            return Err(ServiceError::GroupMismatch {
                first: a.to_string(),
                second: b.to_string(),
            });
        }
        Ok(self.load(a).await?.rank(a, b)?)
    }

    /// Text rendering of the active tree of `id`'s group
    pub async fn draw(&self, id: &MemberId, label: &str) -> ServiceResult<String> {
        Ok(self.load(id).await?.render_with(label)?)
    }

    /// Jail an active member, returning its record
    pub async fn imprison(&self, id: &MemberId) -> ServiceResult<MemberRecord> {
        let mut hierarchy = self.load(id).await?;
        let replacement = hierarchy.replacement_for(id).ok().flatten();
        let jailed = Self::checked("imprison", id, hierarchy.imprison(id))?;
        info!(
            member = %id,
            replacement = ?replacement.as_ref().map(MemberId::as_str),
            "Imprisoned member"
        );

        self.source.save_group(hierarchy.flatten_all()?).await?;
        Ok(jailed)
    }

    /// Release a jailed member, returning its record
    pub async fn release(&self, id: &MemberId) -> ServiceResult<MemberRecord> {
        let mut hierarchy = self.load(id).await?;
        let released = Self::checked("release", id, hierarchy.release(id))?;
        info!(
            member = %id,
            parent = ?released.parent.as_ref().map(MemberId::as_str),
            "Released member"
        );

        self.source.save_group(hierarchy.flatten_all()?).await?;
        Ok(released)
    }

    /// Add a new member under `boss`, in the boss's group
    pub async fn enlist(
        &self,
        boss: &MemberId,
        mut record: MemberRecord,
    ) -> ServiceResult<MemberRecord> {
        let boss_record = self.require(boss).await?;
        match boss_record.group() {
            Some(group) => {
                record.fields.insert(GROUP_FIELD.to_string(), group.into());
            }
            None => {
                record.fields.remove(GROUP_FIELD);
            }
        }

        let mut hierarchy = self.load(boss).await?;
        let enlisted = Self::checked("enlist", boss, hierarchy.enlist(boss, record))?;
        info!(member = %enlisted.id, boss = %boss, "Enlisted member");

        self.source.save_group(hierarchy.flatten_all()?).await?;
        Ok(enlisted)
    }

    async fn require(&self, id: &MemberId) -> ServiceResult<MemberRecord> {
        self.source
            .find_member(id)
            .await?
            .ok_or_else(|| ServiceError::MemberNotFound { id: id.to_string() })
    }

    fn checked<T>(
        operation: &str,
        id: &MemberId,
        result: std::result::Result<T, HierarchyError>,
    ) -> ServiceResult<T> {
        result.map_err(|e| {
            warn!(operation, member = %id, error = %e, "Mutation rejected");
            ServiceError::from(e)
        })
    }
}
