use hashbrown::HashSet as Set;

use crate::message::{NodeId, ProposalId, Reply};
use crate::proposer::Progress;

/// Phase 1 tally: waits for a majority of promises for one proposal.
pub struct Scout<V> {
    proposal: ProposalId,
    waiting: Set<NodeId>,
    minority: usize,
    prior: Option<(ProposalId, V)>,
}

impl<V> Scout<V> {
    pub fn new(proposal: ProposalId, members: &[NodeId], minority: usize) -> Self {
        Scout {
            proposal,
            waiting: members.iter().cloned().collect(),
            minority,
            prior: None,
        }
    }

    /// Completes with the value carried by the highest prior acceptance
    /// among the promises, if any acceptor reported one.
    pub fn observe(&mut self, reply: Reply<V>) -> Progress<Option<V>> {
        if *reply.proposal() != self.proposal {
            return Progress::Waiting
        }
        match reply {
        | Reply::Promise { from, prior, .. } => {
            if !self.waiting.remove(&from) {
                return Progress::Waiting
            }
            if let Some((accepted, value)) = prior {
                let higher = self.prior
                    .as_ref()
                    .map_or(true, |(highest, _)| accepted > *highest);
                if higher {
                    self.prior = Some((accepted, value));
                }
            }
            if self.waiting.len() <= self.minority {
                debug!("{} adopted", self.proposal);
                return Progress::Done(self.prior.take().map(|(_, value)| value))
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
