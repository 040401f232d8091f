//! Read-only queries over the active chain of command

use crate::error::{HierarchyError, Result};
use crate::hierarchy::Hierarchy;
use crate::tree::Node;
use crate::types::{Member, MemberId};
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;

/// Outcome of comparing two members
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    Outranks { winner: MemberId, loser: MemberId },
    Tied(MemberId, MemberId),
}

impl Hierarchy {
    fn active_node(&self, id: &MemberId) -> Result<&Node<Member>> {
        self.tree()
            .find_descendant(self.root_id(), id)
            .ok_or_else(|| HierarchyError::unknown(id))
    }

    /// Everyone under an active member, at any depth
    pub fn subordinate_count(&self, id: &MemberId) -> Result<usize> {
        let node = self.active_node(id)?;
        self.tree().subtree_size(node.id())
    }

    /// Distance from the root; the root is level 0
    pub fn level(&self, id: &MemberId) -> Result<usize> {
        self.tree()
            .depth_of_descendant(self.root_id(), id)
            .ok_or_else(|| HierarchyError::unknown(id))
    }

    /// Length of the longest chain of command beneath an active member
    pub fn chain_depth(&self, id: &MemberId) -> Result<usize> {
        let node = self.active_node(id)?;
        self.tree().depth(node.id())
    }

    /// Compare two active members
    ///
    /// The deeper level wins; on equal level the larger subordinate count
    /// wins; otherwise the two are tied.
    pub fn rank(&self, a: &MemberId, b: &MemberId) -> Result<Ranking> {
        let key_a = (self.level(a)?, self.subordinate_count(a)?);
        let key_b = (self.level(b)?, self.subordinate_count(b)?);

        Ok(match key_a.cmp(&key_b) {
            Ordering::Greater => Ranking::Outranks {
                winner: a.clone(),
                loser: b.clone(),
            },
            Ordering::Less => Ranking::Outranks {
                winner: b.clone(),
                loser: a.clone(),
            },
            Ordering::Equal => Ranking::Tied(a.clone(), b.clone()),
        })
    }

    /// Indented text view of the active tree, labelled by `field`
    pub fn render_with(&self, field: &str) -> Result<String> {
        self.tree()
            .render(self.root_id(), |member| member.label(field))
    }
}

impl fmt::Display for Hierarchy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.render_with("id").map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MemberRecord;

    fn id(s: &str) -> MemberId {
        MemberId::from(s)
    }

    /// a
    /// |_b (Bob)
    ///   |_d
    ///   |_e
    ///     |_f
    /// |_c
    /// g (jailed, under c)
    fn sample() -> Hierarchy {
        Hierarchy::from_records(vec![
            MemberRecord::new("a").with_children(["b", "c"]),
            MemberRecord::new("b")
                .with_parent("a")
                .with_children(["d", "e"])
                .with_field("name", "Bob"),
            MemberRecord::new("c").with_parent("a"),
            MemberRecord::new("d").with_parent("b"),
            MemberRecord::new("e").with_parent("b").with_children(["f"]),
            MemberRecord::new("f").with_parent("e"),
            MemberRecord::new("g").with_parent("c").jailed(),
        ])
        .unwrap()
    }

    #[test]
    fn test_subordinate_count() {
        let h = sample();
        assert_eq!(h.subordinate_count(&id("a")).unwrap(), 5);
        assert_eq!(h.subordinate_count(&id("b")).unwrap(), 3);
        assert_eq!(h.subordinate_count(&id("f")).unwrap(), 0);
        assert_eq!(
            h.subordinate_count(&id("g")).unwrap_err(),
            HierarchyError::unknown("g")
        );
        assert_eq!(
            h.subordinate_count(&id("zz")).unwrap_err(),
            HierarchyError::unknown("zz")
        );
    }

    #[test]
    fn test_level_and_chain_depth() {
        let h = sample();
        assert_eq!(h.level(&id("a")).unwrap(), 0);
        assert_eq!(h.level(&id("e")).unwrap(), 2);
        assert_eq!(h.level(&id("f")).unwrap(), 3);
        assert!(h.level(&id("g")).is_err());

        assert_eq!(h.chain_depth(&id("a")).unwrap(), 3);
        assert_eq!(h.chain_depth(&id("c")).unwrap(), 0);
        assert!(h.chain_depth(&id("g")).is_err());
    }

    #[test]
    fn test_queries_follow_mutations() {
        let mut h = sample();
        h.imprison(&id("e")).unwrap();

        // d stepped in and took f
        assert_eq!(h.subordinate_count(&id("b")).unwrap(), 2);
        assert_eq!(h.tree().parent(&id("f")).unwrap(), Some(&id("d")));
        assert_eq!(h.level(&id("f")).unwrap(), 3);

        h.release(&id("e")).unwrap();
        assert_eq!(h.subordinate_count(&id("b")).unwrap(), 3);
        assert_eq!(h.level(&id("e")).unwrap(), 2);
    }

    #[test]
    fn test_rank() {
        let h = sample();
        assert_eq!(
            h.rank(&id("b"), &id("f")).unwrap(),
            Ranking::Outranks {
                winner: id("f"),
                loser: id("b"),
            }
        );
        // same level, b has more people under it
        assert_eq!(
            h.rank(&id("c"), &id("b")).unwrap(),
            Ranking::Outranks {
                winner: id("b"),
                loser: id("c"),
            }
        );
        assert_eq!(
            h.rank(&id("d"), &id("d")).unwrap(),
            Ranking::Tied(id("d"), id("d"))
        );
        assert_eq!(
            h.rank(&id("a"), &id("g")).unwrap_err(),
            HierarchyError::unknown("g")
        );
    }

    #[test]
    fn test_render_with_label() {
        let h = sample();
        assert_eq!(
            h.render_with("name").unwrap(),
            "a\n  |_Bob\n    |_d\n    |_e\n      |_f\n  |_c\n"
        );
        assert_eq!(
            h.to_string(),
            "a\n  |_b\n    |_d\n    |_e\n      |_f\n  |_c\n"
        );
    }
}
