//! Generic ordered n-ary tree stored in an arena
//!
//! Nodes live in an id-keyed map and refer to each other by id, so a child can
//! point back at its parent without an ownership cycle. A parent's child list
//! is the authority for a live edge; the child's parent pointer is only
//! navigational. [`Tree::detach_child`] severs the forward edge and leaves the
//! back-reference in place, so a detached node can still report where it hung.

use crate::error::{HierarchyError, Result};
use std::collections::{HashMap, VecDeque};
use std::convert::Infallible;
use std::fmt;
use std::hash::Hash;
use std::ops::ControlFlow;

/// Payload stored in a tree node
pub trait NodePayload {
    /// Identifier type, unique within one tree
    type Id: Clone + Eq + Hash + fmt::Debug + fmt::Display;

    /// Identifier of this payload
    fn id(&self) -> &Self::Id;
}

/// A single node: payload, navigational parent pointer and ordered children
#[derive(Debug, Clone)]
pub struct Node<P: NodePayload> {
    payload: P,
    parent: Option<P::Id>,
    children: Vec<P::Id>,
}

impl<P: NodePayload> Node<P> {
    fn new(payload: P) -> Self {
        Self {
            payload,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &P::Id {
        self.payload.id()
    }

    pub fn payload(&self) -> &P {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    /// Navigational parent pointer
    pub fn parent(&self) -> Option<&P::Id> {
        self.parent.as_ref()
    }

    /// Ordered child ids
    pub fn children(&self) -> &[P::Id] {
        &self.children
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }
}

/// A node flattened back to reference form
#[derive(Debug, Clone, PartialEq)]
pub struct FlatNode<P: NodePayload> {
    pub payload: P,
    pub parent: Option<P::Id>,
    pub children: Vec<P::Id>,
}

/// Arena of nodes addressed by id
#[derive(Debug, Clone)]
pub struct Tree<P: NodePayload> {
    nodes: HashMap<P::Id, Node<P>>,
}

impl<P: NodePayload> Default for Tree<P> {
    fn default() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }
}

impl<P: NodePayload> Tree<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &P::Id) -> bool {
        self.nodes.contains_key(id)
    }

    /// Add a detached node
    pub fn insert(&mut self, payload: P) -> Result<P::Id> {
        let id = payload.id().clone();
        if self.nodes.contains_key(&id) {
            return Err(HierarchyError::DuplicateMember { id: id.to_string() });
        }
        self.nodes.insert(id.clone(), Node::new(payload));
        Ok(id)
    }

    pub fn node(&self, id: &P::Id) -> Result<&Node<P>> {
        self.nodes.get(id).ok_or_else(|| HierarchyError::unknown(id))
    }

    fn node_mut(&mut self, id: &P::Id) -> Result<&mut Node<P>> {
        self.nodes.get_mut(id).ok_or_else(|| HierarchyError::unknown(id))
    }

    pub fn payload_mut(&mut self, id: &P::Id) -> Result<&mut P> {
        Ok(self.node_mut(id)?.payload_mut())
    }

    pub fn parent(&self, id: &P::Id) -> Result<Option<&P::Id>> {
        Ok(self.node(id)?.parent())
    }

    pub fn children(&self, id: &P::Id) -> Result<&[P::Id]> {
        Ok(self.node(id)?.children())
    }

    pub fn is_root(&self, id: &P::Id) -> Result<bool> {
        Ok(self.node(id)?.is_root())
    }

    /// Allocate a node for `payload` and attach it under `parent`
    pub fn create_child(&mut self, parent: &P::Id, payload: P) -> Result<P::Id> {
        self.node(parent)?;
        let child = self.insert(payload)?;
        self.attach_child(parent, &child)?;
        Ok(child)
    }

    /// Point `child` at `parent` and list it among `parent`'s children
    ///
    /// Listing is idempotent by id: re-attaching only refreshes the parent
    /// pointer.
    pub fn attach_child(&mut self, parent: &P::Id, child: &P::Id) -> Result<()> {
        if parent == child {
            return Err(HierarchyError::SelfReference {
                id: parent.to_string(),
            });
        }
        self.node(parent)?;
        self.node_mut(child)?.parent = Some(parent.clone());

        let parent_node = self.node_mut(parent)?;
        if !parent_node.children.contains(child) {
            parent_node.children.push(child.clone());
        }
        Ok(())
    }

    /// Remove `child` from `parent`'s child list
    ///
    /// The child's parent pointer is left untouched.
    pub fn detach_child(&mut self, parent: &P::Id, child: &P::Id) -> Result<()> {
        let parent_node = self.node_mut(parent)?;
        let index = parent_node
            .children
            .iter()
            .position(|c| c == child)
            .ok_or_else(|| HierarchyError::NotAChild {
                parent: parent.to_string(),
                child: child.to_string(),
            })?;
        parent_node.children.remove(index);
        Ok(())
    }

    /// Set the navigational parent pointer directly
    pub fn set_parent(&mut self, id: &P::Id, parent: Option<&P::Id>) -> Result<()> {
        if parent == Some(id) {
            return Err(HierarchyError::SelfReference { id: id.to_string() });
        }
        if let Some(parent) = parent {
            self.node(parent)?;
        }
        self.node_mut(id)?.parent = parent.cloned();
        Ok(())
    }

    /// Stable-sort a node's children by a key read from their payloads
    pub fn sort_children_by_key<K, F>(&mut self, id: &P::Id, mut key: F) -> Result<()>
    where
        K: Ord,
        F: FnMut(&P) -> K,
    {
        let mut keyed = self
            .node(id)?
            .children
            .iter()
            .map(|c| -> Result<(K, P::Id)> { Ok((key(self.node(c)?.payload()), c.clone())) })
            .collect::<Result<Vec<_>>>()?;
        keyed.sort_by(|a, b| a.0.cmp(&b.0));
        self.node_mut(id)?.children = keyed.into_iter().map(|(_, c)| c).collect();
        Ok(())
    }

    /// Clear both links of a node, returning what they held
    pub fn take_links(&mut self, id: &P::Id) -> Result<(Option<P::Id>, Vec<P::Id>)> {
        let node = self.node_mut(id)?;
        Ok((node.parent.take(), std::mem::take(&mut node.children)))
    }

    /// Visit strict descendants of `from` depth-first, pre-order
    ///
    /// Stops as soon as the visitor breaks and hands back the break value.
    pub fn traverse<'a, B, F>(&'a self, from: &P::Id, mut visitor: F) -> Result<ControlFlow<B>>
    where
        F: FnMut(&'a Node<P>) -> ControlFlow<B>,
    {
        let mut stack: Vec<&'a P::Id> = self.node(from)?.children.iter().rev().collect();
        while let Some(id) = stack.pop() {
            let node = self.node(id)?;
            if let ControlFlow::Break(value) = visitor(node) {
                return Ok(ControlFlow::Break(value));
            }
            stack.extend(node.children.iter().rev());
        }
        Ok(ControlFlow::Continue(()))
    }

    /// Visit every strict descendant of `from` in pre-order
    pub fn traverse_all<'a, F>(&'a self, from: &P::Id, mut visitor: F) -> Result<()>
    where
        F: FnMut(&'a Node<P>),
    {
        match self.traverse(from, |node| {
            visitor(node);
            ControlFlow::<Infallible>::Continue(())
        })? {
            ControlFlow::Continue(()) => Ok(()),
            ControlFlow::Break(never) => match never {},
        }
    }

    /// Strict descendants of `from` in pre-order
    pub fn descendants(&self, from: &P::Id) -> Result<Vec<P::Id>> {
        let mut out = Vec::new();
        self.traverse_all(from, |node| out.push(node.id().clone()))?;
        Ok(out)
    }

    /// Number of strict descendants
    pub fn subtree_size(&self, id: &P::Id) -> Result<usize> {
        let mut count = 0;
        self.traverse_all(id, |_| count += 1)?;
        Ok(count)
    }

    /// Height of the subtree: 0 for a leaf, else one more than the deepest child
    pub fn depth(&self, id: &P::Id) -> Result<usize> {
        let mut order = vec![id.clone()];
        order.extend(self.descendants(id)?);

        let mut heights: HashMap<&P::Id, usize> = HashMap::with_capacity(order.len());
        for node_id in order.iter().rev() {
            let height = self
                .node(node_id)?
                .children
                .iter()
                .filter_map(|c| heights.get(c))
                .max()
                .map_or(0, |h| h + 1);
            heights.insert(node_id, height);
        }
        Ok(heights.get(id).copied().unwrap_or(0))
    }

    /// Edge distance from `from` down to `target` over live child edges
    pub fn depth_of_descendant(&self, from: &P::Id, target: &P::Id) -> Option<usize> {
        let mut queue = VecDeque::from([(from, 0usize)]);
        while let Some((id, distance)) = queue.pop_front() {
            if id == target {
                return Some(distance);
            }
            if let Some(node) = self.nodes.get(id) {
                queue.extend(node.children.iter().map(|c| (c, distance + 1)));
            }
        }
        None
    }

    /// `from` itself or a strict descendant with the given id
    pub fn find_descendant(&self, from: &P::Id, target: &P::Id) -> Option<&Node<P>> {
        if from == target {
            return self.nodes.get(from);
        }
        let flow = self
            .traverse(from, |node| {
                if node.id() == target {
                    ControlFlow::Break(node)
                } else {
                    ControlFlow::Continue(())
                }
            })
            .ok()?;
        match flow {
            ControlFlow::Break(node) => Some(node),
            ControlFlow::Continue(()) => None,
        }
    }

    /// Parent's children excluding `id`; empty without a parent
    pub fn siblings(&self, id: &P::Id) -> Result<Vec<P::Id>> {
        let Some(parent) = self.node(id)?.parent() else {
            return Ok(Vec::new());
        };
        Ok(self
            .node(parent)?
            .children
            .iter()
            .filter(|c| *c != id)
            .cloned()
            .collect())
    }

    /// Walk parent pointers upward and return the first ancestor matching `predicate`
    ///
    /// Follows navigational pointers whether or not the edge is still live.
    pub fn find_ancestor<F>(&self, id: &P::Id, mut predicate: F) -> Result<Option<P::Id>>
    where
        F: FnMut(&Node<P>) -> bool,
    {
        let mut current = self.node(id)?.parent.clone();
        let mut steps = 0;
        while let Some(ancestor_id) = current {
            // A parent-pointer cycle can not be longer than the arena
            steps += 1;
            if steps > self.nodes.len() {
                return Ok(None);
            }
            let ancestor = self.node(&ancestor_id)?;
            if predicate(ancestor) {
                return Ok(Some(ancestor_id));
            }
            current = ancestor.parent.clone();
        }
        Ok(None)
    }

    /// Multi-line indented rendering of the live subtree under `root`
    pub fn render<F>(&self, root: &P::Id, label: F) -> Result<String>
    where
        F: Fn(&P) -> String,
    {
        let mut out = format!("{}\n", label(self.node(root)?.payload()));
        let mut stack: Vec<(&P::Id, usize)> = self
            .node(root)?
            .children
            .iter()
            .rev()
            .map(|c| (c, 1))
            .collect();
        while let Some((id, depth)) = stack.pop() {
            let node = self.node(id)?;
            out.push_str(&format!(
                "{}|_{}\n",
                " ".repeat(depth * 2),
                label(node.payload())
            ));
            stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
        }
        Ok(out)
    }
}

impl<P: NodePayload + Clone> Tree<P> {
    /// Payload plus current links in reference form
    pub fn flatten(&self, id: &P::Id) -> Result<FlatNode<P>> {
        let node = self.node(id)?;
        Ok(FlatNode {
            payload: node.payload.clone(),
            parent: node.parent.clone(),
            children: node.children.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: String,
        value: u32,
    }

    impl NodePayload for Item {
        type Id = String;

        fn id(&self) -> &String {
            &self.id
        }
    }

    fn item(id: &str) -> Item {
        Item {
            id: id.to_string(),
            value: 0,
        }
    }

    fn key(id: &str) -> String {
        id.to_string()
    }

    /// a
    /// |_b
    ///   |_d
    ///   |_e
    ///     |_f
    /// |_c
    fn sample() -> Tree<Item> {
        let mut tree = Tree::new();
        tree.insert(item("a")).unwrap();
        tree.create_child(&key("a"), item("b")).unwrap();
        tree.create_child(&key("a"), item("c")).unwrap();
        tree.create_child(&key("b"), item("d")).unwrap();
        tree.create_child(&key("b"), item("e")).unwrap();
        tree.create_child(&key("e"), item("f")).unwrap();
        tree
    }

    #[test]
    fn test_create_child_links_both_directions() {
        let mut tree = Tree::new();
        tree.insert(item("root")).unwrap();
        let child = tree
            .create_child(&key("root"), Item { id: key("kid"), value: 7 })
            .unwrap();

        assert_eq!(tree.children(&key("root")).unwrap(), &[child.clone()]);
        assert_eq!(tree.parent(&child).unwrap(), Some(&key("root")));
        assert_eq!(tree.node(&child).unwrap().payload().value, 7);
    }

    #[test]
    fn test_attach_child_is_idempotent_by_id() {
        let mut tree = Tree::new();
        tree.insert(item("p")).unwrap();
        tree.insert(item("q")).unwrap();
        tree.insert(item("c")).unwrap();

        tree.attach_child(&key("p"), &key("c")).unwrap();
        tree.attach_child(&key("p"), &key("c")).unwrap();
        assert_eq!(tree.children(&key("p")).unwrap(), &[key("c")]);

        // Re-attaching elsewhere moves the pointer but not p's list
        tree.attach_child(&key("q"), &key("c")).unwrap();
        assert_eq!(tree.parent(&key("c")).unwrap(), Some(&key("q")));
        assert_eq!(tree.children(&key("p")).unwrap(), &[key("c")]);
    }

    #[test]
    fn test_self_reference_is_rejected() {
        let mut tree = Tree::new();
        tree.insert(item("a")).unwrap();

        assert_eq!(
            tree.attach_child(&key("a"), &key("a")),
            Err(HierarchyError::SelfReference { id: key("a") })
        );
        assert_eq!(
            tree.set_parent(&key("a"), Some(&key("a"))),
            Err(HierarchyError::SelfReference { id: key("a") })
        );
    }

    #[test]
    fn test_detach_child_keeps_parent_pointer() {
        let mut tree = sample();
        tree.detach_child(&key("a"), &key("b")).unwrap();

        assert_eq!(tree.children(&key("a")).unwrap(), &[key("c")]);
        assert_eq!(tree.parent(&key("b")).unwrap(), Some(&key("a")));
        assert!(tree.find_descendant(&key("a"), &key("d")).is_none());
    }

    #[test]
    fn test_detach_non_child_fails() {
        let mut tree = sample();
        assert_eq!(
            tree.detach_child(&key("a"), &key("d")),
            Err(HierarchyError::NotAChild {
                parent: key("a"),
                child: key("d"),
            })
        );
    }

    #[test]
    fn test_duplicate_insert_fails() {
        let mut tree = sample();
        assert!(matches!(
            tree.insert(item("c")),
            Err(HierarchyError::DuplicateMember { .. })
        ));
    }

    #[test]
    fn test_traverse_is_preorder_and_short_circuits() {
        let tree = sample();
        assert_eq!(
            tree.descendants(&key("a")).unwrap(),
            vec![key("b"), key("d"), key("e"), key("f"), key("c")]
        );

        let mut seen = Vec::new();
        let flow = tree
            .traverse(&key("a"), |node| {
                seen.push(node.id().clone());
                if node.id() == "e" {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert!(flow.is_break());
        assert_eq!(seen, vec![key("b"), key("d"), key("e")]);
    }

    #[test]
    fn test_traverse_hands_back_break_value() {
        let tree = sample();
        let flow = tree
            .traverse(&key("a"), |node| {
                if node.children().is_empty() {
                    ControlFlow::Break(node.id().clone())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(flow, ControlFlow::Break(key("d")));

        let mut visited = 0;
        tree.traverse_all(&key("b"), |_| visited += 1).unwrap();
        assert_eq!(visited, 3);
        assert!(tree.traverse_all(&key("zz"), |_| {}).is_err());
    }

    #[test]
    fn test_sort_children_is_stable() {
        let mut tree = Tree::new();
        tree.insert(item("root")).unwrap();
        for (name, value) in [("x", 3), ("y", 1), ("z", 3), ("w", 2)] {
            tree.create_child(&key("root"), Item { id: key(name), value })
                .unwrap();
        }

        tree.sort_children_by_key(&key("root"), |item| item.value)
            .unwrap();
        assert_eq!(
            tree.children(&key("root")).unwrap(),
            &[key("y"), key("w"), key("x"), key("z")]
        );
        assert_eq!(tree.parent(&key("w")).unwrap(), Some(&key("root")));
    }

    #[test]
    fn test_size_and_depth_queries() {
        let tree = sample();
        assert_eq!(tree.subtree_size(&key("a")).unwrap(), 5);
        assert_eq!(tree.subtree_size(&key("e")).unwrap(), 1);
        assert_eq!(tree.subtree_size(&key("f")).unwrap(), 0);

        assert_eq!(tree.depth(&key("a")).unwrap(), 3);
        assert_eq!(tree.depth(&key("b")).unwrap(), 2);
        assert_eq!(tree.depth(&key("c")).unwrap(), 0);

        assert_eq!(tree.depth_of_descendant(&key("a"), &key("a")), Some(0));
        assert_eq!(tree.depth_of_descendant(&key("a"), &key("f")), Some(3));
        assert_eq!(tree.depth_of_descendant(&key("b"), &key("c")), None);
    }

    #[test]
    fn test_find_descendant_includes_self() {
        let tree = sample();
        assert_eq!(
            tree.find_descendant(&key("b"), &key("b")).map(Node::id),
            Some(&key("b"))
        );
        assert_eq!(
            tree.find_descendant(&key("b"), &key("f")).map(Node::id),
            Some(&key("f"))
        );
        assert!(tree.find_descendant(&key("b"), &key("c")).is_none());
        assert!(tree.find_descendant(&key("a"), &key("zz")).is_none());
    }

    #[test]
    fn test_siblings() {
        let tree = sample();
        assert_eq!(tree.siblings(&key("d")).unwrap(), vec![key("e")]);
        assert_eq!(tree.siblings(&key("c")).unwrap(), vec![key("b")]);
        assert!(tree.siblings(&key("a")).unwrap().is_empty());
        assert!(tree.siblings(&key("f")).unwrap().is_empty());
    }

    #[test]
    fn test_find_ancestor_walks_stale_pointers() {
        let mut tree = sample();
        tree.payload_mut(&key("a")).unwrap().value = 1;
        tree.detach_child(&key("e"), &key("f")).unwrap();

        let found = tree
            .find_ancestor(&key("f"), |node| node.payload().value == 1)
            .unwrap();
        assert_eq!(found, Some(key("a")));

        let none = tree.find_ancestor(&key("f"), |_| false).unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn test_flatten_and_is_root() {
        let tree = sample();
        let flat = tree.flatten(&key("b")).unwrap();
        assert_eq!(flat.payload.id, "b");
        assert_eq!(flat.parent, Some(key("a")));
        assert_eq!(flat.children, vec![key("d"), key("e")]);

        assert!(tree.is_root(&key("a")).unwrap());
        assert!(!tree.is_root(&key("b")).unwrap());
    }

    #[test]
    fn test_take_links_clears_node() {
        let mut tree = sample();
        let (parent, children) = tree.take_links(&key("b")).unwrap();
        assert_eq!(parent, Some(key("a")));
        assert_eq!(children, vec![key("d"), key("e")]);
        assert!(tree.is_root(&key("b")).unwrap());
        assert!(tree.children(&key("b")).unwrap().is_empty());
    }

    #[test]
    fn test_render_indents_by_depth() {
        let tree = sample();
        let rendered = tree.render(&key("a"), |item| item.id.clone()).unwrap();
        assert_eq!(
            rendered,
            "a\n  |_b\n    |_d\n    |_e\n      |_f\n  |_c\n"
        );
    }
}
