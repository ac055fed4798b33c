//! Polyline paths for axis lines, tick marks, grid lines and bands.

use glam::Vec2;

/// A command in a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathCommand {
    /// Move to a new position without drawing.
    MoveTo(Vec2),
    /// Draw a line to a position.
    LineTo(Vec2),
    /// Close the current sub-path by drawing a line to the start.
    Close,
}

/// A 2D path consisting of drawing commands.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    commands: Vec<PathCommand>,
}

impl Path {
    /// Create a new empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the commands in this path.
    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    /// Check if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Get the number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Start a new sub-path at `to`.
    pub fn move_to(&mut self, to: Vec2) -> &mut Self {
        self.commands.push(PathCommand::MoveTo(to));
        self
    }

    /// Draw a line to `to`.
    ///
    /// A line with no current sub-path starts one instead.
    pub fn line_to(&mut self, to: Vec2) -> &mut Self {
        if self.commands.is_empty() {
            self.commands.push(PathCommand::MoveTo(to));
        } else {
            self.commands.push(PathCommand::LineTo(to));
        }
        self
    }

    /// Close the current sub-path.
    pub fn close(&mut self) -> &mut Self {
        if !self.commands.is_empty() {
            self.commands.push(PathCommand::Close);
        }
        self
    }

    /// Remove every command.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Number of sub-paths (one per `MoveTo`).
    pub fn subpath_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, PathCommand::MoveTo(_)))
            .count()
    }

    /// All vertices in command order.
    pub fn points(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.commands.iter().filter_map(|cmd| match cmd {
            PathCommand::MoveTo(p) | PathCommand::LineTo(p) => Some(*p),
            PathCommand::Close => None,
        })
    }

    /// Get the bounding box of the path.
    ///
    /// Returns (min, max) corners.
    pub fn bounds(&self) -> Option<(Vec2, Vec2)> {
        let mut points = self.points();
        let first = points.next()?;
        let (min, max) = points.fold((first, first), |(min, max), p| (min.min(p), max.max(p)));
        Some((min, max))
    }
}
