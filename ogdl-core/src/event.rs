//! Event sink that materializes a [`Graph`] from depth-tagged events.
//!
//! The parser and the binary reader both drive the same builder: they add
//! payloads at a current depth, and the sink maintains the rightmost spine
//! of the tree under construction. Depths need not be contiguous; an add
//! at depth 7 after an add at depth 2 attaches under the depth-2 node.
//! This is what makes the parser's indentation-to-depth table safe: it may
//! hand out levels with gaps and the resulting tree is still well-formed.

use crate::graph::{Graph, Payload};

/// Builds a graph from `add`/`inc`/`dec`/`set_level` events.
pub struct EventHandler {
    root: Graph,
    level: usize,
    /// Rightmost spine: (virtual level, child index) per open node.
    /// Virtual levels are strictly increasing from bottom to top.
    spine: Vec<(usize, usize)>,
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler {
    pub fn new() -> EventHandler {
        EventHandler {
            root: Graph::nil(),
            level: 0,
            spine: Vec::new(),
        }
    }

    /// Current depth.
    pub fn level(&self) -> usize {
        self.level
    }

    /// Jump to an absolute depth.
    pub fn set_level(&mut self, level: usize) {
        self.level = level;
    }

    /// Depth of the last add, plus one.
    pub fn inc(&mut self) {
        self.level = match self.spine.last() {
            Some(&(lv, _)) => lv + 1,
            None => self.level + 1,
        };
    }

    /// One level up, saturating at the root.
    pub fn dec(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Attach a new node at the current depth.
    pub fn add(&mut self, payload: impl Into<Payload>) {
        self.push_node(Graph::new(payload));
    }

    /// Attach a new byte-array node at the current depth.
    pub fn add_bytes(&mut self, bytes: Vec<u8>) {
        self.push_node(Graph::new(Payload::Bytes(bytes)));
    }

    fn push_node(&mut self, node: Graph) {
        while self
            .spine
            .last()
            .is_some_and(|&(lv, _)| lv >= self.level)
        {
            self.spine.pop();
        }
        let level = self.level;
        let parent = self.spine_node();
        parent.children.push(node);
        let ix = parent.children.len() - 1;
        self.spine.push((level, ix));
    }

    /// Remove the most recent add at the current depth. Used when a
    /// speculative production fails after emitting.
    pub fn delete(&mut self) {
        let mut target = None;
        while self
            .spine
            .last()
            .is_some_and(|&(lv, _)| lv >= self.level)
        {
            target = self.spine.pop();
        }
        if let Some((_, ix)) = target {
            let parent = self.spine_node();
            parent.children.remove(ix);
        }
    }

    /// Parent designated by the current spine.
    fn spine_node(&mut self) -> &mut Graph {
        fn descend<'g>(node: &'g mut Graph, spine: &[(usize, usize)]) -> &'g mut Graph {
            match spine.split_first() {
                Some((&(_, ix), rest)) => descend(&mut node.children[ix], rest),
                None => node,
            }
        }
        descend(&mut self.root, &self.spine)
    }

    /// Hand over the finished tree.
    pub fn finish(self) -> Graph {
        self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_inc_builds_a_chain() {
        let mut ev = EventHandler::new();
        ev.add("a");
        ev.inc();
        ev.add("b");
        ev.inc();
        ev.add("c");
        let g = ev.finish();
        assert_eq!(g.text(), "a\n  b\n    c");
    }

    #[test]
    fn set_level_groups_siblings() {
        let mut ev = EventHandler::new();
        ev.add("a");
        ev.set_level(1);
        ev.add("b");
        ev.set_level(1);
        ev.add("c");
        let g = ev.finish();
        assert_eq!(g.node("a").unwrap().len(), 2);
    }

    #[test]
    fn sparse_levels_attach_under_nearest_shallower_add() {
        let mut ev = EventHandler::new();
        ev.add("a");
        ev.set_level(7);
        ev.add("b");
        ev.set_level(7);
        ev.add("c");
        let g = ev.finish();
        // both deep adds land directly under `a`, as siblings
        assert_eq!(g.node("a").unwrap().len(), 2);
    }

    #[test]
    fn delete_removes_last_add_at_depth() {
        let mut ev = EventHandler::new();
        ev.add("keep");
        ev.set_level(0);
        ev.add("drop");
        ev.inc();
        ev.dec();
        ev.delete();
        let g = ev.finish();
        assert_eq!(g.len(), 1);
        assert_eq!(g.get(0).unwrap().string(), "keep");
    }

    #[test]
    fn dec_saturates_at_zero() {
        let mut ev = EventHandler::new();
        ev.dec();
        assert_eq!(ev.level(), 0);
    }

    #[test]
    fn add_bytes_carries_raw_payload() {
        let mut ev = EventHandler::new();
        ev.add_bytes(vec![0xff, 0x00]);
        let g = ev.finish();
        assert_eq!(g.get(0).unwrap().payload, Payload::Bytes(vec![0xff, 0x00]));
    }
}
