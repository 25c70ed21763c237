//! Node identities.
//!
//! The narrowing hint map and the implicit-`this` scope-tracker notes (§9)
//! are keyed by expression identity rather than embedded directly on the
//! node, so a backend can look a node up without owning a mutable reference
//! to it. `NodeId` is assigned once, at parse time, and never reused.

use serde::{Deserialize, Serialize};
use std::cell::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

#[derive(Debug, Default)]
pub struct NodeIdGen(Cell<u32>);

impl NodeIdGen {
    pub fn new() -> Self {
        NodeIdGen(Cell::new(0))
    }

    pub fn next(&self) -> NodeId {
        let id = self.0.get();
        self.0.set(id + 1);
        NodeId(id)
    }
}
