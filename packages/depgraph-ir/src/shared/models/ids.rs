//! Element identity
//!
//! Every program element receives a unique id from a process-wide monotonic
//! counter. Ordering, equality and hashing of elements, CFG nodes and PDG
//! nodes all reduce to this id.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

static ID_GENERATOR: AtomicU32 = AtomicU32::new(0);

/// Unique id of a program element
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ElementId(pub u32);

impl ElementId {
    /// Draw the next id from the process-wide counter (thread safe)
    pub fn next() -> Self {
        ElementId(ID_GENERATOR.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
