use hashbrown::HashSet as Set;

use crate::message::{NodeId, ProposalId, Reply};
use crate::proposer::Progress;

/// Phase 2 tally: waits for a majority of acceptances for one proposal.
pub struct Commander {
    proposal: ProposalId,
    waiting: Set<NodeId>,
    minority: usize,
}

impl Commander {
    pub fn new(proposal: ProposalId, members: &[NodeId], minority: usize) -> Self {
        Commander {
            proposal,
            waiting: members.iter().cloned().collect(),
            minority,
        }
    }

    pub fn observe<V>(&mut self, reply: Reply<V>) -> Progress<()> {
        if *reply.proposal() != self.proposal {
            return Progress::Waiting
        }
        match reply {
        | Reply::Accepted { from, .. } => {
            self.waiting.remove(&from);
            if self.waiting.len() <= self.minority {
                debug!("{} chosen", self.proposal);
                return Progress::Done(())
            }
            Progress::Waiting
        }
        | Reply::Reject { promised, .. } if promised > self.proposal => {
            debug!("{} preempted by {}", self.proposal, promised);
            Progress::Preempted(promised)
        }
        | _ => Progress::Waiting,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(round: u64, proposer: &str) -> ProposalId {
        ProposalId::new(round, NodeId::from(proposer))
    }

    fn accepted(from: &str, proposal: ProposalId) -> Reply<String> {
        Reply::Accepted { from: from.into(), proposal }
    }

    #[test]
    fn chosen_on_majority() {
        let members = vec!["a".into(), "b".into(), "c".into()];
        let mut commander = Commander::new(id(3, "a"), &members, 1);
        assert_eq!(commander.observe(accepted("c", id(3, "a"))), Progress::Waiting);
        assert_eq!(commander.observe(accepted("c", id(3, "a"))), Progress::Waiting);
        assert_eq!(commander.observe(accepted("b", id(2, "a"))), Progress::Waiting);
        assert_eq!(commander.observe(accepted("a", id(3, "a"))), Progress::Done(()));
    }

    #[test]
    fn preempted_by_higher_promise() {
        let members = vec!["a".into(), "b".into(), "c".into()];
        let mut commander = Commander::new(id(3, "a"), &members, 1);
        let reject = Reply::<String>::Reject { from: "b".into(), proposal: id(3, "a"), promised: id(4, "b") };
        assert_eq!(commander.observe(reject), Progress::Preempted(id(4, "b")));
    }
}
