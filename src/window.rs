// Copyright 2023 The Druid Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Window handle resolution.
//!
//! The seat never owns windows. It refers to them by [`WindowId`] and asks a
//! [`WindowResolver`] whether they are still alive each time it uses one, so a
//! window destroyed behind our back simply reads as absent.

use std::cell::RefCell;

use kurbo::{Point, Vec2};

use crate::cursor::Cursor;

/// Identifies a window (a surface with a handler attached to it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowKind {
    /// A window placed directly on screen.
    Toplevel,
    /// A window nested inside its parent.
    Child,
    /// A window rendered off screen, optionally hosted inside another window.
    Offscreen { embedder: Option<WindowId> },
}

/// Parent chains longer than this are treated as cycles.
pub const MAX_WINDOW_DEPTH: usize = 64;

/// What the seat needs to know about windows.
pub trait WindowResolver {
    /// Whether the window exists and has not been destroyed.
    fn is_live(&self, window: WindowId) -> bool;

    /// Whether the window itself is shown.
    fn is_visible(&self, window: WindowId) -> bool;

    fn kind(&self, window: WindowId) -> Option<WindowKind>;

    fn parent(&self, window: WindowId) -> Option<WindowId>;

    /// Translate window-local coordinates to root coordinates.
    ///
    /// Returns `None` if the window is not mapped into the root space.
    fn root_coords(&self, window: WindowId, local: Point) -> Option<Point>;

    /// The cursor the application asked for over this window, if any.
    fn cursor(&self, window: WindowId) -> Option<Cursor>;

    /// Whether the window and all of its ancestors are shown.
    fn is_viewable(&self, window: WindowId) -> bool {
        let mut current = window;
        for _ in 0..MAX_WINDOW_DEPTH {
            if !self.is_live(current) || !self.is_visible(current) {
                return false;
            }
            current = match self.kind(current) {
                Some(WindowKind::Child) => match self.parent(current) {
                    Some(parent) => parent,
                    None => return true,
                },
                _ => return true,
            };
        }
        tracing::warn!("parent chain of {:?} does not end", window);
        false
    }

    /// Walk up the parent chain to the top of this window's hierarchy.
    ///
    /// Off-screen windows are the top of their own hierarchy.
    fn toplevel(&self, window: WindowId) -> Option<WindowId> {
        let mut current = window;
        for _ in 0..MAX_WINDOW_DEPTH {
            if !self.is_live(current) {
                return None;
            }
            match self.kind(current)? {
                WindowKind::Child => current = self.parent(current)?,
                WindowKind::Toplevel | WindowKind::Offscreen { .. } => return Some(current),
            }
        }
        tracing::warn!("parent chain of {:?} does not end", window);
        None
    }
}

#[derive(Debug, Clone)]
struct WindowNode {
    kind: WindowKind,
    parent: Option<WindowId>,
    /// Position relative to the parent, or to the root for top-levels.
    origin: Point,
    visible: bool,
    cursor: Option<Cursor>,
}

/// An in-memory window registry.
///
/// Good enough for shells that keep their own window bookkeeping elsewhere and
/// only need to mirror the hierarchy for input routing.
#[derive(Debug, Default)]
pub struct WindowTree {
    nodes: RefCell<im::OrdMap<WindowId, WindowNode>>,
}

impl WindowTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_toplevel(&self, id: WindowId, origin: Point) {
        self.insert(id, WindowKind::Toplevel, None, origin);
    }

    pub fn insert_child(&self, id: WindowId, parent: WindowId, origin: Point) {
        self.insert(id, WindowKind::Child, Some(parent), origin);
    }

    pub fn insert_offscreen(&self, id: WindowId, embedder: Option<WindowId>) {
        self.insert(id, WindowKind::Offscreen { embedder }, None, Point::ZERO);
    }

    fn insert(&self, id: WindowId, kind: WindowKind, parent: Option<WindowId>, origin: Point) {
        tracing::trace!("window {:?} inserted as {:?}", id, kind);
        self.nodes.borrow_mut().insert(
            id,
            WindowNode {
                kind,
                parent,
                origin,
                visible: true,
                cursor: None,
            },
        );
    }

    pub fn set_visible(&self, id: WindowId, visible: bool) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&id) {
            node.visible = visible;
        }
    }

    pub fn set_origin(&self, id: WindowId, origin: Point) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&id) {
            node.origin = origin;
        }
    }

    pub fn set_cursor(&self, id: WindowId, cursor: Option<Cursor>) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&id) {
            node.cursor = cursor;
        }
    }

    pub fn set_embedder(&self, id: WindowId, embedder: Option<WindowId>) {
        if let Some(node) = self.nodes.borrow_mut().get_mut(&id) {
            if let WindowKind::Offscreen { .. } = node.kind {
                node.kind = WindowKind::Offscreen { embedder };
            }
        }
    }

    /// Destroy a window and everything nested inside it.
    pub fn destroy(&self, id: WindowId) {
        let mut nodes = self.nodes.borrow_mut();
        let mut doomed = vec![id];
        while let Some(id) = doomed.pop() {
            if nodes.remove(&id).is_none() {
                continue;
            }
            tracing::trace!("window {:?} destroyed", id);
            doomed.extend(
                nodes
                    .iter()
                    .filter(|(_, node)| node.parent == Some(id))
                    .map(|(child, _)| *child),
            );
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.borrow().is_empty()
    }

    fn node(&self, id: WindowId) -> Option<WindowNode> {
        self.nodes.borrow().get(&id).cloned()
    }
}

impl WindowResolver for WindowTree {
    fn is_live(&self, window: WindowId) -> bool {
        self.nodes.borrow().contains_key(&window)
    }

    fn is_visible(&self, window: WindowId) -> bool {
        self.node(window).map(|node| node.visible).unwrap_or(false)
    }

    fn kind(&self, window: WindowId) -> Option<WindowKind> {
        self.node(window).map(|node| node.kind)
    }

    fn parent(&self, window: WindowId) -> Option<WindowId> {
        self.node(window).and_then(|node| node.parent)
    }

    fn root_coords(&self, window: WindowId, local: Point) -> Option<Point> {
        let mut offset = Vec2::ZERO;
        let mut current = window;
        for _ in 0..MAX_WINDOW_DEPTH {
            let node = self.node(current)?;
            if !node.visible {
                return None;
            }
            offset += node.origin.to_vec2();
            match node.kind {
                WindowKind::Child => current = node.parent?,
                WindowKind::Toplevel => return Some(local + offset),
                WindowKind::Offscreen { .. } => return None,
            }
        }
        None
    }

    fn cursor(&self, window: WindowId) -> Option<Cursor> {
        self.node(window).and_then(|node| node.cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> WindowTree {
        let tree = WindowTree::new();
        tree.insert_toplevel(WindowId(1), Point::new(100., 50.));
        tree.insert_child(WindowId(2), WindowId(1), Point::new(10., 10.));
        tree.insert_child(WindowId(3), WindowId(2), Point::new(1., 2.));
        tree.insert_offscreen(WindowId(4), Some(WindowId(1)));
        tree
    }

    #[test]
    fn root_coords_accumulate_origins() {
        let tree = tree();
        assert_eq!(
            tree.root_coords(WindowId(3), Point::new(5., 5.)),
            Some(Point::new(116., 67.))
        );
    }

    #[test]
    fn offscreen_and_hidden_windows_do_not_resolve() {
        let tree = tree();
        assert_eq!(tree.root_coords(WindowId(4), Point::ZERO), None);
        tree.set_visible(WindowId(1), false);
        assert_eq!(tree.root_coords(WindowId(3), Point::ZERO), None);
        assert!(!tree.is_viewable(WindowId(3)));
    }

    #[test]
    fn toplevel_walks_parents() {
        let tree = tree();
        assert_eq!(tree.toplevel(WindowId(3)), Some(WindowId(1)));
        assert_eq!(tree.toplevel(WindowId(4)), Some(WindowId(4)));
        assert_eq!(tree.toplevel(WindowId(99)), None);
    }

    #[test]
    fn parent_cycles_do_not_resolve() {
        let tree = tree();
        tree.insert_child(WindowId(5), WindowId(5), Point::ZERO);
        tree.insert_child(WindowId(6), WindowId(7), Point::ZERO);
        tree.insert_child(WindowId(7), WindowId(6), Point::ZERO);
        assert_eq!(tree.toplevel(WindowId(5)), None);
        assert_eq!(tree.toplevel(WindowId(6)), None);
        assert!(!tree.is_viewable(WindowId(7)));
        assert_eq!(tree.root_coords(WindowId(5), Point::ZERO), None);
    }

    #[test]
    fn destroy_removes_descendants() {
        let tree = tree();
        tree.destroy(WindowId(2));
        assert!(tree.is_live(WindowId(1)));
        assert!(!tree.is_live(WindowId(2)));
        assert!(!tree.is_live(WindowId(3)));
        assert_eq!(tree.len(), 2);
    }
}
