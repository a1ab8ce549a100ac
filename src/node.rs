//! # Summary
//!
//! A `Node` ties together one cluster member's acceptor, proposer and
//! replicated state. It is cheap to clone: every clone shares the same
//! `Arc`'d internals, so connection tasks and spawned proposals can each
//! hold one.
//!
//! The replicated state is only ever changed through [`Node::propose`] and
//! incoming `commit` messages. Applied decisions are remembered per
//! instance, so duplicate commits are ignored.

use std::sync::Arc;

use hashbrown::HashMap as Map;
use parking_lot::Mutex;

use crate::acceptor::{Acceptor, Instance};
use crate::config::Config;
use crate::error::Error;
use crate::message::{InstanceId, Message, NodeId};
use crate::proposer::Proposer;
use crate::state;
use crate::transport::Transport;

/// What the process should do after handling a message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Control {
    Continue,

    /// Simulated crash: exit immediately without draining anything.
    Terminate,
}

#[derive(Derivative)]
#[derivative(Clone(bound = ""))]
pub struct Node<S: state::State>(Arc<Inner<S>>);

struct Inner<S: state::State> {
    config: Config,
    acceptor: Acceptor<S::Value>,
    proposer: Proposer<S::Value>,
    state: Mutex<S>,
    decisions: Mutex<Map<InstanceId, S::Value>>,
    transport: Arc<dyn Transport>,
}

impl<S: state::State> Node<S> {
    pub fn new(config: Config, transport: Arc<dyn Transport>) -> Self {
        Node(Arc::new(Inner {
            acceptor: Acceptor::new(config.id().clone()),
            proposer: Proposer::new(config.clone()),
            state: Mutex::new(S::default()),
            decisions: Mutex::new(Map::default()),
            config,
            transport,
        }))
    }

    pub fn id(&self) -> &NodeId {
        self.0.config.id()
    }

    pub fn config(&self) -> &Config {
        &self.0.config
    }

    pub fn is_leader(&self) -> bool {
        self.0.config.is_leader()
    }

    /// Executes one protocol message against local state.
    pub fn handle(&self, message: Message<S::Value>) -> Control {
        trace!("received {}", message);
        match message {
        | Message::Prepare { instance, proposal } => {
            let to = proposal.proposer.clone();
            let reply = self.0.acceptor.prepare(&instance, proposal);
            self.send(&to, Message::Reply { instance, reply }.to_string());
        }
        | Message::Accept { instance, proposal, value } => {
            let to = proposal.proposer.clone();
            let reply = self.0.acceptor.accept(&instance, proposal, value);
            self.send(&to, Message::Reply { instance, reply }.to_string());
        }
        | Message::Reply { instance, reply } => {
            self.0.proposer.deliver(&instance, reply);
        }
        | Message::Commit { instance, value } => {
            self.commit(instance, value);
        }
        | Message::Ping(from) => {
            debug!("ping from {}", from.map_or_else(|| "operator".to_string(), |id| id.to_string()));
        }
        | Message::Fail => {
            warn!("received failNode, terminating");
            return Control::Terminate
        }
        }
        Control::Continue
    }

    /// Drives `instance` to a decision, applies it locally and sends a
    /// commit to every other member. Returns the chosen value, which may
    /// differ from `value` if another value was already accepted.
    ///
    /// If this node already applied a decision for `instance`, no round is
    /// run: the decided value is committed to the other members again.
    pub async fn propose(&self, instance: InstanceId, value: S::Value) -> Result<S::Value, Error> {
        if let Some(decided) = self.decision(&instance) {
            info!("{} already decided as {}, re-sending commit", instance, decided);
            self.broadcast_commit(&instance, &decided);
            return Ok(decided)
        }
        let chosen = self.0.proposer
            .propose(&self.0.acceptor, &*self.0.transport, &instance, value)
            .await?;
        info!("chose {} for {}", chosen, instance);
        self.commit(instance.clone(), chosen.clone());
        self.broadcast_commit(&instance, &chosen);
        Ok(chosen)
    }

    /// Applies a decision unless one was already applied for `instance`.
    /// Returns whether the state machine changed.
    fn commit(&self, instance: InstanceId, value: S::Value) -> bool {
        let mut decisions = self.0.decisions.lock();
        if let Some(previous) = decisions.get(&instance) {
            if *previous != value {
                error!("conflicting commit for {}: have {}, got {}", instance, previous, value);
            }
            debug!("ignoring duplicate commit for {}", instance);
            return false
        }
        info!("committing {} for {}", value, instance);
        decisions.insert(instance.clone(), value.clone());
        self.0.state.lock().execute(&instance, value);
        true
    }

    fn broadcast_commit(&self, instance: &InstanceId, value: &S::Value) {
        let line = Message::Commit {
            instance: instance.clone(),
            value: value.clone(),
        }.to_string();
        for peer in self.0.config.peers() {
            self.send(peer, line.clone());
        }
    }

    /// Value applied for `instance` on this node, if any.
    pub fn decision(&self, instance: &InstanceId) -> Option<S::Value> {
        self.0.decisions.lock().get(instance).cloned()
    }

    /// Acceptor state of `instance` on this node.
    pub fn instance(&self, instance: &InstanceId) -> Option<Instance<S::Value>> {
        self.0.acceptor.instance(instance)
    }

    /// Runs `f` against the replicated state. Never hold the result across
    /// a network round trip; copy out what is needed.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.0.state.lock())
    }

    /// Local, non-agreed access to the state for bookkeeping that is not
    /// replicated (staging, candidate tables).
    pub fn write<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.0.state.lock())
    }

    pub fn send(&self, dest: &NodeId, line: String) {
        self.0.transport.send(dest, line);
    }
}
