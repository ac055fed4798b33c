//! A layer of interchangeable path children that are pooled between draws.

use polaris_core::Rect;

use crate::{Color, NodeId, Surface};

/// Pool of path nodes under a single layer.
///
/// [`clear`](Self::clear) detaches and empties every child but keeps it for
/// reuse, so redrawing the same number of bands allocates nothing.
#[derive(Debug, Default)]
pub struct TypedLayer {
    layer: Option<NodeId>,
    pool: Vec<NodeId>,
    used: usize,
}

impl TypedLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// The layer node, created on first use.
    pub fn layer(&mut self, surface: &mut Surface) -> NodeId {
        match self.layer {
            Some(layer) if surface.contains(layer) => layer,
            _ => {
                let layer = surface.create_layer();
                self.layer = Some(layer);
                self.pool.clear();
                self.used = 0;
                layer
            }
        }
    }

    /// The layer node if it was ever created.
    pub fn layer_id(&self) -> Option<NodeId> {
        self.layer
    }

    /// Next unused child, attached and empty.
    pub fn gen_next_child(&mut self, surface: &mut Surface) -> NodeId {
        let layer = self.layer(surface);
        let child = match self.pool.get(self.used) {
            Some(&child) => child,
            None => {
                let child = surface.create_path();
                surface.set_stroke(child, None);
                self.pool.push(child);
                child
            }
        };
        surface.clear_path(child);
        surface.set_z_index(child, surface.z_index(layer));
        surface.set_parent(child, Some(layer));
        self.used += 1;
        child
    }

    /// Detach and empty every child.
    pub fn clear(&mut self, surface: &mut Surface) {
        for &child in &self.pool[..self.used] {
            surface.clear_path(child);
            surface.set_parent(child, None);
        }
        self.used = 0;
    }

    /// Children handed out since the last clear.
    pub fn children(&self) -> &[NodeId] {
        &self.pool[..self.used]
    }

    pub fn set_fill(&self, surface: &mut Surface, fill: Option<Color>) {
        for &child in self.children() {
            surface.set_fill(child, fill);
        }
    }

    pub fn set_parent(&mut self, surface: &mut Surface, parent: Option<NodeId>) {
        let layer = self.layer(surface);
        surface.set_parent(layer, parent);
    }

    pub fn set_z_index(&mut self, surface: &mut Surface, z_index: f32) {
        let layer = self.layer(surface);
        surface.set_z_index(layer, z_index);
        for &child in &self.pool {
            surface.set_z_index(child, z_index);
        }
    }

    pub fn set_clip(&mut self, surface: &mut Surface, clip: Option<Rect>) {
        let layer = self.layer(surface);
        surface.set_clip(layer, clip);
    }
}
