//! Scene graph and hierarchical scene organization.
//!
//! The graph is an ownership tree: a parent owns its children, and removing a
//! node drops its whole subtree. Structural changes (`add` / `remove`) are
//! staged and only applied by [`SceneGraph::commit`], which the frame
//! scheduler calls once at the start of every tick. A traversal borrows the
//! graph immutably, so the snapshot handed to the renderer can never change
//! underneath it.

use std::sync::atomic::{AtomicU64, Ordering};

use cgmath::{Matrix4, SquareMatrix};
use log::{debug, warn};

use crate::data_structures::{model::Renderable, transform::Transform};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// A node: local transform, optional renderable payload, owned children.
///
/// Nodes without a payload only group others (a loaded model's root, the camera).
#[derive(Debug)]
pub struct SceneNode {
    id: NodeId,
    pub name: String,
    pub transform: Transform,
    pub visible: bool,
    pub renderable: Option<Renderable>,
    children: Vec<SceneNode>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NodeId::next(),
            name: name.into(),
            transform: Transform::default(),
            visible: true,
            renderable: None,
            children: Vec::new(),
        }
    }

    pub fn with_renderable(mut self, renderable: Renderable) -> Self {
        self.renderable = Some(renderable);
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn children(&self) -> &[SceneNode] {
        &self.children
    }

    /// Attach a child directly. Only meant for assembling detached subtrees
    /// (e.g. a decoded model) before they are handed to [`SceneGraph::add`].
    pub fn push_child(&mut self, child: SceneNode) {
        self.children.push(child);
    }

    pub fn find(&self, id: NodeId) -> Option<&SceneNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    pub fn find_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        if self.id == id {
            return Some(self);
        }
        self.children.iter_mut().find_map(|child| child.find_mut(id))
    }

    pub fn find_by_name(&self, name: &str) -> Option<&SceneNode> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find_by_name(name))
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(SceneNode::subtree_len).sum::<usize>()
    }

    fn detach(&mut self, id: NodeId) -> Option<SceneNode> {
        if let Some(pos) = self.children.iter().position(|c| c.id == id) {
            return Some(self.children.remove(pos));
        }
        self.children.iter_mut().find_map(|child| child.detach(id))
    }
}

enum Pending {
    Add { parent: NodeId, child: SceneNode },
    Remove(NodeId),
}

/// What a [`SceneGraph::commit`] applied.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub added: usize,
    pub removed: usize,
    pub dropped: usize,
}

pub struct SceneGraph {
    root: SceneNode,
    pending: Vec<Pending>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            root: SceneNode::new("root"),
            pending: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root.id
    }

    /// Stage `child` (and its subtree) for insertion under `parent`.
    ///
    /// The node becomes visible to traversals after the next [`commit`](Self::commit).
    pub fn add(&mut self, parent: NodeId, child: SceneNode) -> NodeId {
        let id = child.id;
        self.pending.push(Pending::Add { parent, child });
        id
    }

    /// Stage removal of `node` and everything below it.
    pub fn remove(&mut self, node: NodeId) {
        self.pending.push(Pending::Remove(node));
    }

    /// Apply all staged changes in the order they were issued.
    pub fn commit(&mut self) -> CommitReport {
        let mut report = CommitReport::default();
        for change in std::mem::take(&mut self.pending) {
            match change {
                Pending::Add { parent, child } => match self.root.find_mut(parent) {
                    Some(parent_node) => {
                        debug!("adding node {:?} ({}) under {:?}", child.id, child.name, parent);
                        parent_node.children.push(child);
                        report.added += 1;
                    }
                    None => {
                        warn!(
                            "dropping node {:?} ({}): parent {:?} is not in the scene",
                            child.id, child.name, parent
                        );
                        report.dropped += 1;
                    }
                },
                Pending::Remove(id) if id == self.root.id => {
                    warn!("the scene root cannot be removed");
                }
                Pending::Remove(id) => match self.root.detach(id) {
                    Some(node) => {
                        debug!("removed node {:?} ({}) with {} nodes", id, node.name, node.subtree_len());
                        report.removed += 1;
                    }
                    None => warn!("cannot remove {:?}: not in the scene", id),
                },
            }
        }
        report
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.root.find(id).is_some()
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.root.find(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.root.find_mut(id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&SceneNode> {
        self.root.find_by_name(name)
    }

    /// Committed node count, root included.
    pub fn len(&self) -> usize {
        self.root.subtree_len()
    }

    pub fn is_empty(&self) -> bool {
        self.root.children.is_empty()
    }

    /// World matrix of a committed node.
    pub fn world_matrix(&self, id: NodeId) -> Option<Matrix4<f32>> {
        self.traverse().find(|visit| visit.node.id == id).map(|visit| visit.world)
    }

    /// Lazy pre-order walk; parents are always yielded before their children.
    pub fn traverse(&self) -> Traverse<'_> {
        Traverse {
            stack: vec![(&self.root, Matrix4::identity(), 0, true)],
        }
    }
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

/// One node reached by a traversal.
pub struct Visit<'a> {
    pub node: &'a SceneNode,
    /// `parent.world * node.transform.to_matrix()`
    pub world: Matrix4<f32>,
    pub depth: usize,
    /// The node and all of its ancestors are visible.
    pub visible: bool,
}

impl Visit<'_> {
    pub fn is_drawable(&self) -> bool {
        self.visible && self.node.renderable.is_some()
    }
}

pub struct Traverse<'a> {
    stack: Vec<(&'a SceneNode, Matrix4<f32>, usize, bool)>,
}

impl<'a> Iterator for Traverse<'a> {
    type Item = Visit<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let (node, parent_world, depth, parent_visible) = self.stack.pop()?;
        let world = parent_world * node.transform.to_matrix();
        let visible = parent_visible && node.visible;
        self.stack.extend(
            node.children
                .iter()
                .rev()
                .map(|child| (child, world, depth + 1, visible)),
        );
        Some(Visit {
            node,
            world,
            depth,
            visible,
        })
    }
}
