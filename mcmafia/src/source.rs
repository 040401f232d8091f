//! Member sources: where flat member lists come from and go back to

use crate::error::{ServiceError, ServiceResult};
use crate::types::{MemberId, MemberRecord};
use async_trait::async_trait;
use indexmap::IndexMap;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Storage abstraction for member records
///
/// A group is every record sharing the grouping key of a given member. The
/// hierarchy is always built from exactly one group.
#[async_trait]
pub trait MemberSource: Send + Sync {
    /// Get a single member by id
    async fn find_member(&self, id: &MemberId) -> ServiceResult<Option<MemberRecord>>;

    /// Get every member in the same group as `id`
    async fn fetch_group(&self, id: &MemberId) -> ServiceResult<Vec<MemberRecord>>;

    /// Get every member of a named organization; `None` is the ungrouped set
    async fn fetch_organization(
        &self,
        organization: Option<&str>,
    ) -> ServiceResult<Vec<MemberRecord>>;

    /// Upsert records by id, returning them as stored
    async fn save_group(&self, records: Vec<MemberRecord>) -> ServiceResult<Vec<MemberRecord>>;
}

/// Select `id`'s group out of a full member list, keeping list order
pub fn group_of(records: Vec<MemberRecord>, id: &MemberId) -> ServiceResult<Vec<MemberRecord>> {
    let group = records
        .iter()
        .find(|r| &r.id == id)
        .map(|r| r.group().map(str::to_owned))
        .ok_or_else(|| ServiceError::MemberNotFound { id: id.to_string() })?;

    Ok(records
        .into_iter()
        .filter(|r| r.group() == group.as_deref())
        .collect())
}

/// Members of one organization, keeping list order
pub fn organization_members(
    records: Vec<MemberRecord>,
    organization: Option<&str>,
) -> Vec<MemberRecord> {
    records
        .into_iter()
        .filter(|r| r.group() == organization)
        .collect()
}

/// Replace records with matching ids in place, append the rest
pub fn upsert(stored: &mut Vec<MemberRecord>, records: &[MemberRecord]) {
    let mut positions: HashMap<MemberId, usize> = stored
        .iter()
        .enumerate()
        .map(|(i, r)| (r.id.clone(), i))
        .collect();
    for record in records {
        match positions.get(&record.id) {
            Some(&i) => stored[i] = record.clone(),
            None => {
                positions.insert(record.id.clone(), stored.len());
                stored.push(record.clone());
            }
        }
    }
}

/// In-process member source kept in insertion order
#[derive(Debug, Default)]
pub struct InMemoryMemberSource {
    records: RwLock<IndexMap<MemberId, MemberRecord>>,
}

impl InMemoryMemberSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the source; later duplicates replace earlier ones
    pub fn with_records(records: impl IntoIterator<Item = MemberRecord>) -> Self {
        let records = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            records: RwLock::new(records),
        }
    }

    /// Snapshot of every stored record
    pub async fn all(&self) -> Vec<MemberRecord> {
        self.records.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl MemberSource for InMemoryMemberSource {
    async fn find_member(&self, id: &MemberId) -> ServiceResult<Option<MemberRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn fetch_group(&self, id: &MemberId) -> ServiceResult<Vec<MemberRecord>> {
        group_of(self.all().await, id)
    }

    async fn fetch_organization(
        &self,
        organization: Option<&str>,
    ) -> ServiceResult<Vec<MemberRecord>> {
        Ok(organization_members(self.all().await, organization))
    }

    async fn save_group(&self, records: Vec<MemberRecord>) -> ServiceResult<Vec<MemberRecord>> {
        let mut stored = self.records.write().await;
        for record in &records {
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GROUP_FIELD;

    fn source() -> InMemoryMemberSource {
        InMemoryMemberSource::with_records(vec![
            MemberRecord::new("a").with_field(GROUP_FIELD, "north"),
            MemberRecord::new("x"),
            MemberRecord::new("b").with_field(GROUP_FIELD, "north"),
            MemberRecord::new("y"),
            MemberRecord::new("c").with_field(GROUP_FIELD, "south"),
        ])
    }

    fn ids(records: &[MemberRecord]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_fetch_group_by_organization() {
        let source = source();

        let north = source.fetch_group(&MemberId::from("b")).await.unwrap();
        assert_eq!(ids(&north), vec!["a", "b"]);

        let ungrouped = source.fetch_group(&MemberId::from("x")).await.unwrap();
        assert_eq!(ids(&ungrouped), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_fetch_organization_by_name() {
        let source = source();

        let north = source.fetch_organization(Some("north")).await.unwrap();
        assert_eq!(ids(&north), vec!["a", "b"]);

        let ungrouped = source.fetch_organization(None).await.unwrap();
        assert_eq!(ids(&ungrouped), vec!["x", "y"]);

        assert!(source
            .fetch_organization(Some("east"))
            .await
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut stored = vec![MemberRecord::new("a"), MemberRecord::new("b")];
        upsert(
            &mut stored,
            &[
                MemberRecord::new("c"),
                MemberRecord::new("a").jailed(),
                MemberRecord::new("c").with_parent("a"),
            ],
        );

        assert_eq!(ids(&stored), vec!["a", "b", "c"]);
        assert!(stored[0].incapacitated);
        assert_eq!(stored[2].parent, Some(MemberId::from("a")));
    }

    #[tokio::test]
    async fn test_fetch_group_of_unknown_member() {
        let err = source()
            .fetch_group(&MemberId::from("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::MemberNotFound { id } if id == "nope"));
    }

    #[tokio::test]
    async fn test_save_group_upserts() {
        let source = source();
        source
            .save_group(vec![
                MemberRecord::new("a").jailed(),
                MemberRecord::new("z"),
            ])
            .await
            .unwrap();

        let a = source.find_member(&MemberId::from("a")).await.unwrap().unwrap();
        assert!(a.incapacitated);
        assert_eq!(a.group(), None);
        assert_eq!(ids(&source.all().await), vec!["a", "x", "b", "y", "c", "z"]);
    }
}
