use std::collections::BTreeSet;
use std::fmt;

use synod::NodeId;

/// Set of directed links the router silently drops traffic on.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FailedLinks(BTreeSet<(NodeId, NodeId)>);

impl FailedLinks {
    /// Idempotent. Returns whether the link was up before.
    pub fn block(&mut self, src: NodeId, dest: NodeId) -> bool {
        self.0.insert((src, dest))
    }

    /// Idempotent. Returns whether the link was down before.
    pub fn unblock(&mut self, src: &NodeId, dest: &NodeId) -> bool {
        self.0.remove(&(src.clone(), dest.clone()))
    }

    pub fn is_blocked(&self, src: &NodeId, dest: &NodeId) -> bool {
        self.0.contains(&(src.clone(), dest.clone()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(NodeId, NodeId)> {
        self.0.iter()
    }
}

impl fmt::Display for FailedLinks {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        if self.0.is_empty() {
            return write!(fmt, "no failed links")
        }
        let mut first = true;
        for (src, dest) in &self.0 {
            if !first {
                writeln!(fmt)?;
            }
            write!(fmt, "{} -> {}", src, dest)?;
            first = false;
        }
        Ok(())
    }
}
