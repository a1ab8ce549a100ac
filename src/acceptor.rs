//! # Summary
//!
//! This module defines the `Acceptor`, which acts as Paxos's distributed
//! memory. One acceptor per node keeps, for every instance it has heard
//! of, the highest proposal it promised and the last value it accepted.
//!
//! Rejections never fault the acceptor: they only tell the proposer which
//! proposal it has to outrank.

use hashbrown::HashMap as Map;
use parking_lot::Mutex;

use crate::message::{InstanceId, NodeId, ProposalId, Reply};
use crate::state;

/// Acceptor state for a single instance.
#[derive(Derivative)]
#[derivative(Default(bound = ""))]
#[derive(Clone, Debug, PartialEq)]
pub struct Instance<V> {
    /// Highest proposal promised
    pub promised: Option<ProposalId>,

    /// Most recently accepted proposal and its value
    pub accepted: Option<(ProposalId, V)>,
}

#[derive(Debug)]
pub struct Acceptor<V> {
    id: NodeId,
    instances: Mutex<Map<InstanceId, Instance<V>>>,
}

impl<V: state::Value> Acceptor<V> {
    pub fn new(id: NodeId) -> Self {
        Acceptor {
            id,
            instances: Mutex::new(Map::default()),
        }
    }

    /// Phase 1b. Promises `proposal` if it outranks every earlier promise.
    pub fn prepare(&self, instance: &InstanceId, proposal: ProposalId) -> Reply<V> {
        let mut instances = self.instances.lock();
        let state = instances.entry(instance.clone()).or_default();
        match &state.promised {
        | Some(promised) if *promised >= proposal => {
            trace!("rejecting prepare {} for {}: promised {}", proposal, instance, promised);
            Reply::Reject {
                from: self.id.clone(),
                proposal,
                promised: promised.clone(),
            }
        }
        | _ => {
            debug!("promising {} for {}", proposal, instance);
            state.promised = Some(proposal.clone());
            Reply::Promise {
                from: self.id.clone(),
                proposal,
                prior: state.accepted.clone(),
            }
        }
        }
    }

    /// Phase 2b. Accepts `value` unless a higher proposal was promised since.
    pub fn accept(&self, instance: &InstanceId, proposal: ProposalId, value: V) -> Reply<V> {
        let mut instances = self.instances.lock();
        let state = instances.entry(instance.clone()).or_default();
        match &state.promised {
        | Some(promised) if *promised > proposal => {
            trace!("rejecting accept {} for {}: promised {}", proposal, instance, promised);
            Reply::Reject {
                from: self.id.clone(),
                proposal,
                promised: promised.clone(),
            }
        }
        | _ => {
            debug!("accepting {} for {} with value {}", proposal, instance, value);
            state.promised = Some(proposal.clone());
            state.accepted = Some((proposal.clone(), value));
            Reply::Accepted {
                from: self.id.clone(),
                proposal,
            }
        }
        }
    }

    /// Copy of the current state of `instance`, if it was ever referenced.
    pub fn instance(&self, instance: &InstanceId) -> Option<Instance<V>> {
        self.instances.lock().get(instance).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(round: u64, proposer: &str) -> ProposalId {
        ProposalId::new(round, NodeId::from(proposer))
    }

    fn acceptor() -> Acceptor<String> {
        Acceptor::new(NodeId::from("b"))
    }

    #[test]
    fn promises_only_higher_proposals() {
        let acceptor = acceptor();
        let instance = InstanceId::from("create-c1");
        assert!(matches!(acceptor.prepare(&instance, id(2, "a")), Reply::Promise { prior: None, .. }));
        assert!(matches!(acceptor.prepare(&instance, id(2, "a")), Reply::Reject { .. }));
        match acceptor.prepare(&instance, id(1, "z")) {
        | Reply::Reject { promised, .. } => assert_eq!(promised, id(2, "a")),
        | other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(acceptor.prepare(&instance, id(2, "c")), Reply::Promise { .. }));
    }

    #[test]
    fn promise_reports_prior_acceptance() {
        let acceptor = acceptor();
        let instance = InstanceId::from("choose-c1-0");
        acceptor.prepare(&instance, id(1, "a"));
        acceptor.accept(&instance, id(1, "a"), "4".to_string());
        match acceptor.prepare(&instance, id(2, "a")) {
        | Reply::Promise { prior, .. } => assert_eq!(prior, Some((id(1, "a"), "4".to_string()))),
        | other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn accepts_equal_or_higher_and_keeps_accepted_below_promised() {
        let acceptor = acceptor();
        let instance = InstanceId::from("choose-c1-0");
        acceptor.prepare(&instance, id(3, "a"));
        assert!(matches!(acceptor.accept(&instance, id(2, "a"), "old".into()), Reply::Reject { .. }));
        assert!(matches!(acceptor.accept(&instance, id(3, "a"), "new".into()), Reply::Accepted { .. }));

        // An accept without a prior prepare is fine as long as nothing higher was promised.
        assert!(matches!(acceptor.accept(&instance, id(4, "a"), "newer".into()), Reply::Accepted { .. }));

        let state = acceptor.instance(&instance).unwrap();
        let (accepted, value) = state.accepted.clone().unwrap();
        assert_eq!(value, "newer");
        assert!(accepted <= state.promised.unwrap());
    }

    #[test]
    fn instances_are_independent() {
        let acceptor = acceptor();
        acceptor.prepare(&InstanceId::from("create-c1"), id(9, "a"));
        assert!(matches!(
            acceptor.prepare(&InstanceId::from("create-c2"), id(1, "a")),
            Reply::Promise { .. }
        ));
        assert!(acceptor.instance(&InstanceId::from("create-c3")).is_none());
    }
}
