//! # Summary
//!
//! The single-decree proposer. Each call to [`Proposer::propose`] drives
//! one instance through prepare and accept rounds until a majority of
//! acceptors has accepted a value under a single proposal.
//!
//! Phase 1 is tallied by a [`scout::Scout`] and phase 2 by a
//! [`commander::Commander`], following the roles of
//! [Paxos Made Moderately Complex][1]. Each phase waits at most the
//! configured timeout; a timeout or a rejection naming a higher proposal
//! ends the attempt, and the next one starts after a randomized backoff
//! with a strictly higher round.
//!
//! [1]: http://paxos.systems/index.html

use std::sync::Arc;
use std::time;

use hashbrown::HashMap as Map;
use parking_lot::{Mutex, RwLock};

use crate::acceptor::Acceptor;
use crate::config::Config;
use crate::error::Error;
use crate::internal;
use crate::message::{InstanceId, Message, ProposalId, Reply};
use crate::state;
use crate::transport::Transport;

pub(crate) mod commander;
pub(crate) mod scout;

use self::commander::Commander;
use self::scout::Scout;

/// Result of feeding one reply into a phase tally.
#[derive(Debug, PartialEq)]
pub enum Progress<T> {
    Waiting,
    Done(T),
    Preempted(ProposalId),
}

/// Why an attempt ended without choosing a value.
enum Failure {
    Timeout,
    Preempted(ProposalId),
}

pub struct Proposer<V> {
    config: Config,

    /// Highest round used by this proposer or seen in a rejection
    round: Mutex<u64>,

    /// Reply channels of the rounds currently in flight
    rounds: RwLock<Map<InstanceId, internal::Tx<Reply<V>>>>,

    /// Serializes proposals for the same instance
    guards: Mutex<Map<InstanceId, Arc<tokio::sync::Mutex<()>>>>,
}

impl<V: state::Value> Proposer<V> {
    pub fn new(config: Config) -> Self {
        Proposer {
            config,
            round: Mutex::new(0),
            rounds: RwLock::new(Map::default()),
            guards: Mutex::new(Map::default()),
        }
    }

    /// Forwards an acceptor reply to the round waiting on `instance`.
    pub fn deliver(&self, instance: &InstanceId, reply: Reply<V>) {
        match self.rounds.read().get(instance) {
        | Some(tx) => tx.try_send(reply),
        | None => trace!("dropping reply for idle instance {}: {:?}", instance, reply),
        }
    }

    /// Runs prepare/accept rounds for `instance` until some value is chosen,
    /// which is `value` unless an acceptor already accepted another one.
    pub async fn propose(
        &self,
        acceptor: &Acceptor<V>,
        transport: &dyn Transport,
        instance: &InstanceId,
        value: V,
    ) -> Result<V, Error> {
        let lease = Lease::new(self, instance);
        let _exclusive = lease.guard.lock().await;
        let (mut rx, tx) = internal::new();
        let _registration = Registration::new(self, instance, tx);

        let mut backoff = self.config.backoff().as_secs_f32() * rand::random::<f32>();
        for attempt in 1..=self.config.max_attempts() {
            if attempt > 1 {
                tokio::time::sleep(time::Duration::from_secs_f32(backoff)).await;
                backoff *= 1.0 + rand::random::<f32>() / 2.0;
            }
            match self.attempt(acceptor, transport, instance, &value, &mut rx).await {
            | Ok(chosen) => return Ok(chosen),
            | Err(Failure::Timeout) => {
                info!("attempt {} for {} timed out", attempt, instance);
            }
            | Err(Failure::Preempted(promised)) => {
                info!("attempt {} for {} preempted by {}", attempt, instance, promised);
                self.observe(&promised);
            }
            }
        }
        warn!("giving up on {} after {} attempts", instance, self.config.max_attempts());
        Err(Error::NotChosen {
            instance: instance.clone(),
            attempts: self.config.max_attempts(),
        })
    }

    async fn attempt(
        &self,
        acceptor: &Acceptor<V>,
        transport: &dyn Transport,
        instance: &InstanceId,
        value: &V,
        rx: &mut internal::Rx<Reply<V>>,
    ) -> Result<V, Failure> {
        let proposal = self.next_proposal();
        let members = self.config.members();
        let minority = self.config.minority();

        info!("prepare {} for {}", proposal, instance);
        self.narrowcast(transport, Message::Prepare {
            instance: instance.clone(),
            proposal: proposal.clone(),
        });
        let local = acceptor.prepare(instance, proposal.clone());
        let mut scout = Scout::new(proposal.clone(), members, minority);
        let adopted = self.collect(rx, local, |reply| scout.observe(reply)).await?;

        let value = match adopted {
        | Some(prior) => {
            if prior != *value {
                info!("{} adopting previously accepted {} over {}", instance, prior, value);
            }
            prior
        }
        | None => value.clone(),
        };

        info!("accept {} for {} with {}", proposal, instance, value);
        self.narrowcast(transport, Message::Accept {
            instance: instance.clone(),
            proposal: proposal.clone(),
            value: value.clone(),
        });
        let local = acceptor.accept(instance, proposal.clone(), value.clone());
        let mut commander = Commander::new(proposal, members, minority);
        self.collect(rx, local, |reply| commander.observe(reply)).await?;
        Ok(value)
    }

    /// Feeds the local acceptor's reply and then remote replies into
    /// `observe` until it completes, is preempted, or the phase times out.
    async fn collect<T, F>(
        &self,
        rx: &mut internal::Rx<Reply<V>>,
        local: Reply<V>,
        mut observe: F,
    ) -> Result<T, Failure>
        where F: FnMut(Reply<V>) -> Progress<T>
    {
        let deadline = tokio::time::Instant::now() + self.config.timeout();
        let mut next = Some(local);
        loop {
            let reply = match next.take() {
            | Some(reply) => reply,
            | None => match rx.recv_until(deadline).await {
                | Some(reply) => reply,
                | None => return Err(Failure::Timeout),
                },
            };
            match observe(reply) {
            | Progress::Waiting => (),
            | Progress::Done(done) => return Ok(done),
            | Progress::Preempted(promised) => return Err(Failure::Preempted(promised)),
            }
        }
    }

    fn narrowcast(&self, transport: &dyn Transport, message: Message<V>) {
        let line = message.to_string();
        for peer in self.config.peers() {
            transport.send(peer, line.clone());
        }
    }

    /// Next proposal, strictly above every round used or seen so far.
    fn next_proposal(&self) -> ProposalId {
        let mut round = self.round.lock();
        *round += 1;
        ProposalId::new(*round, self.config.id().clone())
    }

    /// Records a competing proposal so the next round jumps past it.
    fn observe(&self, promised: &ProposalId) {
        let mut round = self.round.lock();
        *round = std::cmp::max(*round, promised.round);
    }
}

/// Shared handle on an instance's proposal guard. The last lease to go
/// removes the guard from the table.
struct Lease<'a, V> {
    proposer: &'a Proposer<V>,
    instance: InstanceId,
    guard: Arc<tokio::sync::Mutex<()>>,
}

impl<'a, V> Lease<'a, V> {
    fn new(proposer: &'a Proposer<V>, instance: &InstanceId) -> Self {
        let guard = proposer.guards
            .lock()
            .entry(instance.clone())
            .or_default()
            .clone();
        Lease {
            proposer,
            instance: instance.clone(),
            guard,
        }
    }
}

impl<'a, V> Drop for Lease<'a, V> {
    fn drop(&mut self) {
        let mut guards = self.proposer.guards.lock();
        // One reference in the table, one here.
        if Arc::strong_count(&self.guard) == 2 {
            guards.remove(&self.instance);
        }
    }
}

/// Keeps a round's reply channel registered for as long as it is alive.
struct Registration<'a, V> {
    proposer: &'a Proposer<V>,
    instance: InstanceId,
}

impl<'a, V> Registration<'a, V> {
    fn new(proposer: &'a Proposer<V>, instance: &InstanceId, tx: internal::Tx<Reply<V>>) -> Self {
        proposer.rounds.write().insert(instance.clone(), tx);
        Registration {
            proposer,
            instance: instance.clone(),
        }
    }
}

impl<'a, V> Drop for Registration<'a, V> {
    fn drop(&mut self) {
        self.proposer.rounds.write().remove(&self.instance);
    }
}
