//! Retained drawing surface.
//!
//! The surface is a tree of layers, paths and text nodes stored in a
//! generational arena. Chart elements own [`NodeId`]s into it and mutate their
//! nodes during `draw`; a backend walks the attached tree to render.
//!
//! Nodes can exist detached (no parent). Only nodes reachable from
//! [`Surface::root`] are considered visible.

use polaris_core::Rect;
use polaris_core::alloc::{IndexSlot, SparseSet};
use polaris_core::math::Vec2;

use crate::{Color, Path, Stroke};

/// Handle to a node in a [`Surface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(IndexSlot);

/// A positioned text run.
#[derive(Debug, Clone, PartialEq)]
pub struct TextNode {
    pub text: String,
    /// Box the text occupies, padding included.
    pub bounds: Rect,
    pub color: Color,
    pub font_size: f32,
}

/// A path with optional stroke and fill.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathNode {
    pub path: Path,
    pub stroke: Option<Stroke>,
    pub fill: Option<Color>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Layer,
    Path(PathNode),
    Text(TextNode),
}

#[derive(Debug, Clone)]
struct SurfaceNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    z_index: f32,
    clip: Option<Rect>,
}

impl SurfaceNode {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            z_index: 0.0,
            clip: None,
        }
    }
}

/// Arena-backed scene that chart elements draw into.
#[derive(Debug, Clone)]
pub struct Surface {
    nodes: SparseSet<SurfaceNode>,
    root: NodeId,
}

impl Default for Surface {
    fn default() -> Self {
        Self::new()
    }
}

impl Surface {
    /// Create a surface containing only the root layer.
    pub fn new() -> Self {
        let mut nodes = SparseSet::new();
        let root = NodeId(nodes.push(SurfaceNode::new(NodeKind::Layer)));
        Self { nodes, root }
    }

    /// The root layer.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Create a detached layer.
    pub fn create_layer(&mut self) -> NodeId {
        NodeId(self.nodes.push(SurfaceNode::new(NodeKind::Layer)))
    }

    /// Create a detached, empty path.
    pub fn create_path(&mut self) -> NodeId {
        NodeId(
            self.nodes
                .push(SurfaceNode::new(NodeKind::Path(PathNode::default()))),
        )
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: TextNode) -> NodeId {
        NodeId(self.nodes.push(SurfaceNode::new(NodeKind::Text(text))))
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.nodes.contains(node.0)
    }

    /// Number of live nodes, root included.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn kind(&self, node: NodeId) -> Option<&NodeKind> {
        self.nodes.get(node.0).map(|n| &n.kind)
    }

    /// Attach `node` under `parent`, or detach it with `None`.
    ///
    /// Attaching to a non-layer or to a stale handle detaches instead.
    pub fn set_parent(&mut self, node: NodeId, parent: Option<NodeId>) {
        if !self.contains(node) || Some(node) == parent {
            return;
        }
        let parent = parent.filter(|p| matches!(self.kind(*p), Some(NodeKind::Layer)));

        if let Some(old) = self.nodes.get(node.0).and_then(|n| n.parent) {
            if Some(old) == parent {
                return;
            }
            if let Some(old_node) = self.nodes.get_mut(old.0) {
                old_node.children.retain(|c| *c != node);
            }
        }
        if let Some(p) = parent
            && let Some(parent_node) = self.nodes.get_mut(p.0)
        {
            parent_node.children.push(node);
        }
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.parent = parent;
        }
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(node.0).and_then(|n| n.parent)
    }

    /// Children of `layer`, ordered by z-index then insertion.
    pub fn children(&self, layer: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get(layer.0) else {
            return Vec::new();
        };
        let mut children = node.children.clone();
        children.sort_by(|a, b| self.z_index(*a).total_cmp(&self.z_index(*b)));
        children
    }

    /// Whether `node` is reachable from the root.
    pub fn is_attached(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    pub fn set_z_index(&mut self, node: NodeId, z_index: f32) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.z_index = z_index;
        }
    }

    pub fn z_index(&self, node: NodeId) -> f32 {
        self.nodes.get(node.0).map_or(0.0, |n| n.z_index)
    }

    pub fn set_clip(&mut self, node: NodeId, clip: Option<Rect>) {
        if let Some(n) = self.nodes.get_mut(node.0) {
            n.clip = clip;
        }
    }

    pub fn clip(&self, node: NodeId) -> Option<Rect> {
        self.nodes.get(node.0).and_then(|n| n.clip)
    }

    pub fn path_node(&self, node: NodeId) -> Option<&PathNode> {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Path(path)) => Some(path),
            _ => None,
        }
    }

    pub fn path_node_mut(&mut self, node: NodeId) -> Option<&mut PathNode> {
        match self.nodes.get_mut(node.0).map(|n| &mut n.kind) {
            Some(NodeKind::Path(path)) => Some(path),
            _ => None,
        }
    }

    pub fn path(&self, node: NodeId) -> Option<&Path> {
        self.path_node(node).map(|p| &p.path)
    }

    pub fn move_to(&mut self, node: NodeId, to: Vec2) {
        if let Some(p) = self.path_node_mut(node) {
            p.path.move_to(to);
        }
    }

    pub fn line_to(&mut self, node: NodeId, to: Vec2) {
        if let Some(p) = self.path_node_mut(node) {
            p.path.line_to(to);
        }
    }

    pub fn close(&mut self, node: NodeId) {
        if let Some(p) = self.path_node_mut(node) {
            p.path.close();
        }
    }

    /// Drop all path commands, keeping stroke and fill.
    pub fn clear_path(&mut self, node: NodeId) {
        if let Some(p) = self.path_node_mut(node) {
            p.path.clear();
        }
    }

    pub fn set_stroke(&mut self, node: NodeId, stroke: Option<Stroke>) {
        if let Some(p) = self.path_node_mut(node) {
            p.stroke = stroke;
        }
    }

    pub fn set_fill(&mut self, node: NodeId, fill: Option<Color>) {
        if let Some(p) = self.path_node_mut(node) {
            p.fill = fill;
        }
    }

    pub fn text(&self, node: NodeId) -> Option<&TextNode> {
        match self.nodes.get(node.0).map(|n| &n.kind) {
            Some(NodeKind::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn set_text(&mut self, node: NodeId, text: TextNode) {
        if let Some(n) = self.nodes.get_mut(node.0)
            && matches!(n.kind, NodeKind::Text(_))
        {
            n.kind = NodeKind::Text(text);
        }
    }

    /// Remove `node` and everything below it. The root cannot be removed.
    pub fn remove(&mut self, node: NodeId) {
        if node == self.root {
            return;
        }
        self.set_parent(node, None);
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(removed) = self.nodes.remove(id.0) {
                stack.extend(removed.children);
            }
        }
    }

    /// All attached text nodes, in draw order.
    pub fn attached_texts(&self) -> Vec<&TextNode> {
        let mut out = Vec::new();
        self.walk(self.root, &mut |id| {
            if let Some(text) = self.text(id) {
                out.push(text);
            }
        });
        out
    }

    /// All attached path nodes, in draw order.
    pub fn attached_paths(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.walk(self.root, &mut |id| {
            if self.path_node(id).is_some() {
                out.push(id);
            }
        });
        out
    }

    fn walk(&self, node: NodeId, visit: &mut impl FnMut(NodeId)) {
        visit(node);
        for child in self.children(node) {
            self.walk(child, visit);
        }
    }
}
