//! Chain-of-command model built from one group's flat member list
//!
//! A [`Hierarchy`] holds exactly one active tree plus one detached entry per
//! incapacitated member. Each jailed member keeps a [`LastKnownPosition`]:
//! the superior it answered to and the subordinates it had when it was
//! removed. Release uses that memory to put the member back without the caller
//! resupplying the old topology.
//!
//! Instances are meant to be short lived: build from a snapshot, apply one
//! mutation, flatten, discard.

use crate::error::{HierarchyError, Result};
use crate::tree::Tree;
use crate::types::{Member, MemberId, MemberRecord};
use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};

/// Where a jailed member last sat in the active chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastKnownPosition {
    /// Superior at the time of imprisonment, `None` if it was the root
    pub parent: Option<MemberId>,
    /// Subordinates at the time of imprisonment, in order
    pub children: Vec<MemberId>,
}

/// One group's chain of command
#[derive(Debug, Clone)]
pub struct Hierarchy {
    tree: Tree<Member>,
    root: MemberId,
    jailed: IndexMap<MemberId, LastKnownPosition>,
}

impl Hierarchy {
    /// Build the hierarchy from a flat member list
    ///
    /// Every referenced id must be present, active records must agree with
    /// each other about their edges, and exactly one active member may be
    /// parentless.
    pub fn from_records<I>(records: I) -> Result<Self>
    where
        I: IntoIterator<Item = MemberRecord>,
    {
        let records: Vec<MemberRecord> = records.into_iter().collect();

        let mut jailed_flags: HashMap<MemberId, bool> = HashMap::with_capacity(records.len());
        for record in &records {
            if jailed_flags
                .insert(record.id.clone(), record.incapacitated)
                .is_some()
            {
                return Err(HierarchyError::DuplicateMember {
                    id: record.id.to_string(),
                });
            }
        }
        for record in &records {
            for child in &record.children {
                if !jailed_flags.contains_key(child) {
                    return Err(HierarchyError::dangling(child));
                }
            }
            if let Some(parent) = &record.parent {
                if !jailed_flags.contains_key(parent) {
                    return Err(HierarchyError::dangling(parent));
                }
            }
        }

        let mut tree = Tree::new();
        let mut links = Vec::with_capacity(records.len());
        for record in records {
            let (member, parent, children) = record.into_parts();
            let incapacitated = member.incapacitated;
            let id = tree.insert(member)?;
            links.push((id, incapacitated, parent, children));
        }

        let mut jailed = IndexMap::new();
        let mut active = Vec::new();
        for (id, incapacitated, parent, children) in links {
            if incapacitated {
                jailed.insert(id, LastKnownPosition { parent, children });
                continue;
            }
            for child in &children {
                if jailed_flags[child] {
                    return Err(HierarchyError::IncapacitatedInActiveChain {
                        id: child.to_string(),
                    });
                }
                tree.attach_child(&id, child)?;
            }
            if let Some(parent) = &parent {
                if jailed_flags[parent] {
                    return Err(HierarchyError::IncapacitatedInActiveChain {
                        id: parent.to_string(),
                    });
                }
            }
            active.push((id, parent));
        }
        // Declared parents win over whatever attaching implied
        for (id, parent) in &active {
            tree.set_parent(id, parent.as_ref())?;
        }
        let active: Vec<MemberId> = active.into_iter().map(|(id, _)| id).collect();

        for id in &active {
            for child in tree.children(id)? {
                if tree.parent(child)? != Some(id) {
                    return Err(HierarchyError::InconsistentEdge {
                        parent: id.to_string(),
                        child: child.to_string(),
                    });
                }
            }
        }

        let roots: Vec<&MemberId> = active
            .iter()
            .filter(|id| tree.parent(id).map_or(false, |p| p.is_none()))
            .collect();
        let root = match roots.as_slice() {
            [root] => (*root).clone(),
            _ => {
                return Err(HierarchyError::MissingOrAmbiguousRoot { count: roots.len() });
            }
        };

        let mut reachable: HashSet<MemberId> = tree.descendants(&root)?.into_iter().collect();
        reachable.insert(root.clone());
        if let Some(detached) = active.iter().find(|id| !reachable.contains(*id)) {
            return Err(HierarchyError::DetachedMember {
                id: detached.to_string(),
            });
        }

        Ok(Self { tree, root, jailed })
    }

    /// The underlying node arena
    pub fn tree(&self) -> &Tree<Member> {
        &self.tree
    }

    /// Id of the active root
    pub fn root_id(&self) -> &MemberId {
        &self.root
    }

    /// The active root's payload
    pub fn root(&self) -> Option<&Member> {
        self.member(&self.root)
    }

    /// Payload of any member, active or jailed
    pub fn member(&self, id: &MemberId) -> Option<&Member> {
        self.tree.node(id).ok().map(|node| node.payload())
    }

    /// Number of members, active and jailed
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn is_active(&self, id: &MemberId) -> bool {
        self.tree.find_descendant(&self.root, id).is_some()
    }

    pub fn is_jailed(&self, id: &MemberId) -> bool {
        self.jailed.contains_key(id)
    }

    /// Jailed member ids in the order they were recorded
    pub fn jailed(&self) -> impl Iterator<Item = &MemberId> {
        self.jailed.keys()
    }

    pub fn last_known_position(&self, id: &MemberId) -> Option<&LastKnownPosition> {
        self.jailed.get(id)
    }

    /// Remove an active member from the chain of command
    ///
    /// The most senior sibling takes the slot; without siblings the most senior
    /// subordinate is promoted into it. Either way the remaining subordinates
    /// answer to the replacement. Returns the jailed member's record.
    pub fn imprison(&mut self, id: &MemberId) -> Result<MemberRecord> {
        let mut scratch = self.clone();
        let record = scratch.imprison_in_place(id)?;
        *self = scratch;
        Ok(record)
    }

    /// Put a jailed member back at the nearest surviving position
    ///
    /// Subordinates it had when jailed are reclaimed unless they are jailed
    /// themselves. It then hangs under its former superior, or the closest
    /// active ancestor of that superior; with none left it becomes the root.
    pub fn release(&mut self, id: &MemberId) -> Result<MemberRecord> {
        let mut scratch = self.clone();
        let record = scratch.release_in_place(id)?;
        *self = scratch;
        Ok(record)
    }

    /// Add a new active member as the last subordinate of `boss`
    pub fn enlist(&mut self, boss: &MemberId, record: MemberRecord) -> Result<MemberRecord> {
        if !self.is_active(boss) {
            return Err(HierarchyError::unknown(boss));
        }
        let (mut member, _, _) = record.into_parts();
        member.incapacitated = false;
        let id = self.tree.create_child(boss, member)?;
        self.flatten_member(&id)
    }

    /// Flatten every member: jailed first, then the active tree in pre-order
    pub fn flatten_all(&self) -> Result<Vec<MemberRecord>> {
        let active = std::iter::once(self.root.clone()).chain(self.tree.descendants(&self.root)?);
        self.jailed
            .keys()
            .cloned()
            .chain(active)
            .map(|id| self.flatten_member(&id))
            .collect()
    }

    /// Flatten one member, using its remembered links when jailed
    pub fn flatten_member(&self, id: &MemberId) -> Result<MemberRecord> {
        let flat = self.tree.flatten(id)?;
        Ok(match self.jailed.get(id) {
            Some(position) => MemberRecord::from_parts(
                flat.payload,
                position.parent.clone(),
                position.children.clone(),
            ),
            None => MemberRecord::from_parts(flat.payload, flat.parent, flat.children),
        })
    }

    fn imprison_in_place(&mut self, id: &MemberId) -> Result<MemberRecord> {
        if !self.is_active(id) {
            return Err(HierarchyError::unknown(id));
        }
        let replacement = self
            .replacement_for(id)?
            .ok_or_else(|| HierarchyError::NoReplacement { id: id.to_string() })?;
        // Promotion from below leaves the subordinates in seniority order
        if self.tree.siblings(id)?.is_empty() {
            self.tree.sort_children_by_key(id, Member::seniority)?;
        }

        let subordinates = self.tree.children(id)?.to_vec();
        for child in subordinates.iter().filter(|c| **c != replacement) {
            self.tree.attach_child(&replacement, child)?;
        }

        match self.tree.parent(id)?.cloned() {
            None => {
                self.tree.set_parent(&replacement, None)?;
                self.root = replacement;
            }
            Some(parent) => {
                self.tree.attach_child(&parent, &replacement)?;
                self.tree.detach_child(&parent, id)?;
            }
        }

        let (parent, children) = self.tree.take_links(id)?;
        self.tree.payload_mut(id)?.incapacitated = true;
        self.jailed
            .insert(id.clone(), LastKnownPosition { parent, children });
        self.flatten_member(id)
    }

    fn release_in_place(&mut self, id: &MemberId) -> Result<MemberRecord> {
        let position = self
            .jailed
            .shift_remove(id)
            .ok_or_else(|| HierarchyError::unknown(id))?;

        for child in &position.children {
            let node = self.tree.node(child)?;
            if node.payload().incapacitated {
                continue;
            }
            if let Some(parent) = node.parent().cloned() {
                self.tree.detach_child(&parent, child)?;
            }
            self.tree.attach_child(id, child)?;
        }

        match self.nearest_active_ancestor(id, position.parent)? {
            Some(ancestor) => self.tree.attach_child(&ancestor, id)?,
            None => {
                self.tree.set_parent(id, None)?;
                if self.root != *id && self.tree.is_root(&self.root)? {
                    let previous = self.root.clone();
                    self.tree.attach_child(id, &previous)?;
                }
                self.root = id.clone();
            }
        }

        self.tree.payload_mut(id)?.incapacitated = false;
        self.flatten_member(id)
    }

    /// Who would take `id`'s slot: most senior sibling, else most senior child
    pub fn replacement_for(&self, id: &MemberId) -> Result<Option<MemberId>> {
        let siblings = self.tree.siblings(id)?;
        let candidates = if siblings.is_empty() {
            self.tree.children(id)?.to_vec()
        } else {
            siblings
        };
        Ok(candidates
            .iter()
            .filter_map(|c| self.tree.node(c).ok())
            .min_by_key(|node| node.payload().seniority())
            .map(|node| node.id().clone()))
    }

    /// Climb remembered superiors until one is active and outside `id`'s own subtree
    fn nearest_active_ancestor(
        &self,
        id: &MemberId,
        start: Option<MemberId>,
    ) -> Result<Option<MemberId>> {
        let mut candidate = start;
        // Each member is visited at most once on a well-formed chain
        for _ in 0..=self.tree.len() {
            let Some(ancestor) = candidate else {
                return Ok(None);
            };
            if let Some(position) = self.jailed.get(&ancestor) {
                candidate = position.parent.clone();
                continue;
            }
            let inside = ancestor == *id
                || self
                    .tree
                    .find_ancestor(&ancestor, |node| node.id() == id)?
                    .is_some();
            if !inside {
                return Ok(Some(ancestor));
            }
            candidate = self.tree.parent(&ancestor)?.cloned();
        }
        Ok(None)
    }
}
