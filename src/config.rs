use std::time;

use crate::error::Error;
use crate::message::NodeId;

#[derive(Clone, Debug)]
pub struct Config {
    /// This node's identifier
    id: NodeId,

    /// Fixed cluster membership, including this node
    members: Vec<NodeId>,

    /// The single static proposer
    leader: NodeId,

    /// Timeout for each prepare or accept phase
    timeout: time::Duration,

    /// Upper bound of the initial randomized retry delay
    backoff: time::Duration,

    /// Attempts before a proposal gives up
    max_attempts: usize,
}

impl Config {
    pub fn new(id: NodeId, members: Vec<NodeId>, leader: NodeId) -> Result<Self, Error> {
        if members.is_empty() {
            return Err(Error::Config("cluster has no members".to_string()))
        }
        if !members.contains(&id) {
            return Err(Error::Config(format!("{} is not a cluster member", id)))
        }
        if !members.contains(&leader) {
            return Err(Error::Config(format!("leader {} is not a cluster member", leader)))
        }
        let mut members = members;
        members.sort();
        members.dedup();
        Ok(Config {
            id,
            members,
            leader,
            timeout: time::Duration::from_secs(1),
            backoff: time::Duration::from_millis(100),
            max_attempts: 10,
        })
    }

    pub fn with_timeout(mut self, timeout: time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: time::Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = std::cmp::max(max_attempts, 1);
        self
    }

    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn leader(&self) -> &NodeId {
        &self.leader
    }

    pub fn is_leader(&self) -> bool {
        self.id == self.leader
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    /// Every member except this node.
    pub fn peers(&self) -> impl Iterator<Item = &NodeId> {
        self.members.iter().filter(move |member| **member != self.id)
    }

    /// Largest number of members that can be missing from a majority.
    pub fn minority(&self) -> usize {
        (self.members.len() - 1) / 2
    }

    pub fn timeout(&self) -> time::Duration {
        self.timeout
    }

    pub fn backoff(&self) -> time::Duration {
        self.backoff
    }

    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> Vec<NodeId> {
        vec!["a".into(), "b".into(), "c".into()]
    }

    #[test]
    fn three_members_tolerate_one_failure() {
        let config = Config::new("a".into(), members(), "a".into()).unwrap();
        assert_eq!(config.minority(), 1);
        assert!(config.is_leader());
        assert_eq!(config.peers().cloned().collect::<Vec<_>>(), vec![NodeId::from("b"), NodeId::from("c")]);
    }

    #[test]
    fn rejects_outsiders() {
        assert!(Config::new("d".into(), members(), "a".into()).is_err());
        assert!(Config::new("a".into(), members(), "d".into()).is_err());
        assert!(Config::new("a".into(), Vec::new(), "a".into()).is_err());
    }
}
