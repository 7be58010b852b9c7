//! The open-frame stack the Tracer Loop uses to track in-progress
//! activations between stops.
//!
//! Implements a cactus-stack discipline: closing a frame never deallocates
//! it, it only moves the "current" pointer up to the parent, so a sibling
//! subtree already closed stays addressable in its parent's child list
//! while later siblings are still open.

use gdbminer_core::{ConsumedRange, FrameId, OwnedSpan, ParseNode};

struct OpenFrame {
    frame: FrameId,
    parent: Option<u32>,
    children: Vec<ParseNode>,
    owned_spans: Vec<OwnedSpan>,
    attributed: Vec<usize>,
}

impl OpenFrame {
    fn range(&self) -> ConsumedRange {
        let child_range = self
            .children
            .iter()
            .map(|c| c.range)
            .reduce(|a, b| a.union(&b));
        let direct_lo = self.attributed.iter().min().copied();
        let direct_hi = self.attributed.iter().max().map(|m| m + 1);

        match (child_range, direct_lo, direct_hi) {
            (Some(cr), Some(lo), Some(hi)) => cr.union(&ConsumedRange::new(lo, hi)),
            (Some(cr), _, _) => cr,
            (None, Some(lo), Some(hi)) => ConsumedRange::new(lo, hi),
            (None, None, _) => ConsumedRange::empty_at(0),
        }
    }
}

/// Append-only arena of in-progress `ParseNode`s, indexed by an arena id
/// (not by depth directly — depth can repeat after a pop/push cycle, the
/// arena id cannot).
pub struct FrameArena {
    frames: Vec<OpenFrame>,
    current: Option<u32>,
}

impl FrameArena {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            current: None,
        }
    }

    /// Open a new frame as a child of the current one (or as the root, if
    /// none is open yet).
    pub fn open(&mut self, frame: FrameId) -> u32 {
        let parent = self.current;
        let id = self.frames.len() as u32;
        self.frames.push(OpenFrame {
            frame,
            parent,
            children: Vec::new(),
            owned_spans: Vec::new(),
            attributed: Vec::new(),
        });
        self.current = Some(id);
        id
    }

    pub fn current(&self) -> Option<u32> {
        self.current
    }

    /// The `FrameId` of the currently open innermost frame, as given to
    /// `open()`.
    pub fn current_frame(&self) -> Option<FrameId> {
        self.current.map(|id| self.frames[id as usize].frame)
    }

    pub fn depth(&self) -> u32 {
        let mut depth = 0;
        let mut cursor = self.current;
        while let Some(id) = cursor {
            depth += 1;
            cursor = self.frames[id as usize].parent;
        }
        depth
    }

    /// Record that the currently-open innermost frame directly read `index`.
    pub fn attribute_to_current(&mut self, index: usize) {
        if let Some(id) = self.current {
            self.frames[id as usize].attributed.push(index);
        }
    }

    /// Record an owned span directly on the currently-open innermost frame.
    pub fn push_owned_span(&mut self, span: OwnedSpan) {
        if let Some(id) = self.current {
            self.frames[id as usize].owned_spans.push(span);
        }
    }

    /// Close the current frame, finalizing its `ConsumedRange` and appending
    /// it to its parent's child list (or returning it, if it was the root).
    /// Moves `current` to the parent.
    pub fn close_current(&mut self) -> Option<ParseNode> {
        let id = self.current?;
        let open = &self.frames[id as usize];
        let range = open.range();
        let node = ParseNode {
            frame: open.frame,
            range,
            children: self.frames[id as usize].children.clone(),
            owned_spans: self.frames[id as usize].owned_spans.clone(),
        };
        let parent = self.frames[id as usize].parent;
        self.current = parent;
        match parent {
            Some(parent_id) => {
                self.frames[parent_id as usize].children.push(node);
                None
            }
            None => Some(node),
        }
    }

    /// Close every still-open frame in LIFO order (§4.D "AtExit"),
    /// returning the finished root.
    pub fn close_all(&mut self) -> Option<ParseNode> {
        let mut root = None;
        while self.current.is_some() {
            if let Some(finished) = self.close_current() {
                root = Some(finished);
            }
        }
        root
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}

impl Default for FrameArena {
    fn default() -> Self {
        Self::new()
    }
}
