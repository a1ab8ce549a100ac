//! # Summary
//!
//! Node-side request handling. Each inbound line is decoded into a
//! [`Request`] and dispatched by variant:
//!
//! * `create` and `choose` are driven through the agreement engine by the
//!   leader and ignored by followers;
//! * `query` stages the question locally and asks the answer backend for a
//!   candidate, which followers forward to the leader;
//! * `view` and `viewall` print the local transcript;
//! * everything else is protocol traffic for the engine.
//!
//! Handling never blocks on the network: proposals and backend calls run
//! on their own tasks.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;

use synod::{Control, InstanceId, Node, NodeId};

use crate::context::Store;
use crate::error::Error;
use crate::mutation::Mutation;
use crate::oracle::{self, Oracle};
use crate::request::Request;

#[derive(Clone)]
pub struct Server {
    node: Node<Store>,
    oracle: Arc<dyn Oracle>,
}

pub fn create_instance(context: &str) -> InstanceId {
    InstanceId::new(format!("create-{}", context))
}

/// Instance deciding the `answers`-th answer of `context`.
pub fn choose_instance(context: &str, answers: usize) -> InstanceId {
    InstanceId::new(format!("choose-{}-{}", context, answers))
}

impl Server {
    pub fn new(node: Node<Store>, oracle: Arc<dyn Oracle>) -> Self {
        Server { node, oracle }
    }

    pub fn node(&self) -> &Node<Store> {
        &self.node
    }

    /// Serves inbound lines until the listener fails. A `failNode` request
    /// ends the process on the spot.
    pub async fn run(self, listener: TcpListener) -> Result<(), Error> {
        synod::socket::serve(listener, move |line| {
            let server = self.clone();
            async move {
                if server.handle_line(&line) == Control::Terminate {
                    std::process::exit(1);
                }
            }
        }).await?;
        Ok(())
    }

    pub fn handle_line(&self, line: &str) -> Control {
        match line.parse::<Request>() {
        | Ok(request) => self.handle(request),
        | Err(error) => {
            warn!("ignoring {}", error);
            Control::Continue
        }
        }
    }

    pub fn handle(&self, request: Request) -> Control {
        match request {
        | Request::Create { context } => {
            if self.node.is_leader() {
                let server = self.clone();
                spawn_logged(async move { server.create(&context).await.map(drop) });
            } else {
                debug!("follower ignoring create {}", context);
            }
        }
        | Request::Query { context, text } => {
            let server = self.clone();
            spawn_logged(async move { server.query(&context, &text).await });
        }
        | Request::Choose { context, node } => {
            if self.node.is_leader() {
                let server = self.clone();
                spawn_logged(async move { server.choose(&context, &node).await.map(drop) });
            } else {
                debug!("follower ignoring choose {} {}", context, node);
            }
        }
        | Request::Candidate { context, round, node, answer } => {
            self.candidate(&context, round, node, answer);
        }
        | Request::View { context } => {
            println!("{}", self.view(&context));
        }
        | Request::ViewAll => {
            println!("{}", self.view_all());
        }
        | Request::Protocol(message) => return self.node.handle(message),
        }
        Control::Continue
    }

    /// Agrees on the creation of `context`.
    pub async fn create(&self, context: &str) -> Result<Mutation, Error> {
        let mutation = Mutation::Create { context: context.to_string() };
        let chosen = self.node.propose(create_instance(context), mutation).await?;
        info!("NEW CONTEXT {}", context);
        Ok(chosen)
    }

    /// Stages `text` and produces this node's candidate answer for it.
    pub async fn query(&self, context: &str, text: &str) -> Result<(), Error> {
        let (round, transcript) = self.node
            .write(|store| store.stage_query(context, text))
            .ok_or_else(|| Error::UnknownContext(context.to_string()))?;
        info!("NEW QUERY on {}: {}", context, text);

        let answer = self.oracle.answer(&oracle::prompt(&transcript)).await?;
        let answer = oracle::normalize(&answer)
            .ok_or_else(|| Error::Oracle("empty answer".to_string()))?;
        info!("({}) candidate from {}: {}", context, self.node.id(), answer);

        if self.node.is_leader() {
            self.candidate(context, round, self.node.id().clone(), answer);
        } else {
            let candidate = Request::Candidate {
                context: context.to_string(),
                round,
                node: self.node.id().clone(),
                answer,
            };
            self.node.send(self.node.config().leader(), candidate.to_string());
        }
        Ok(())
    }

    /// Agrees on `node`'s candidate as the next answer of `context`.
    /// Returns the committed mutation, which is an earlier proposal's
    /// answer if one was already accepted for this slot.
    pub async fn choose(&self, context: &str, node: &NodeId) -> Result<Mutation, Error> {
        let (answers, text) = self.node.read(|store| {
            let answers = store.context(context).map(|entry| entry.answers());
            let text = store.candidate(context, node).map(str::to_string);
            (answers, text)
        });
        let answers = answers.ok_or_else(|| Error::UnknownContext(context.to_string()))?;
        let text = text.ok_or_else(|| Error::NoCandidate {
            context: context.to_string(),
            node: node.clone(),
        })?;

        let mutation = Mutation::Answer { context: context.to_string(), text };
        let chosen = self.node
            .propose(choose_instance(context, answers), mutation.clone())
            .await?;
        if chosen != mutation {
            warn!("{} slot {} was already decided as {}", context, answers, chosen);
        }
        info!("CHOSEN ANSWER on {}: {}", context, chosen);
        Ok(chosen)
    }

    /// Records `node`'s candidate unless the round it answers has
    /// already been decided.
    pub fn candidate(&self, context: &str, round: usize, node: NodeId, answer: String) {
        if !self.node.is_leader() {
            debug!("follower ignoring candidate from {}", node);
            return
        }
        let from = node.clone();
        if self.node.write(|store| store.record_candidate(context, round, node, answer)) {
            info!("({}) recorded candidate from {} for round {}", context, from, round);
        } else {
            info!("({}) dropping candidate from {} for stale round {}", context, from, round);
        }
    }

    pub fn view(&self, context: &str) -> String {
        self.node
            .read(|store| store.view(context))
            .unwrap_or_else(|| format!("no context {}", context))
    }

    pub fn view_all(&self) -> String {
        self.node.read(Store::view_all)
    }
}

fn spawn_logged<F>(task: F)
    where F: Future<Output = Result<(), Error>> + Send + 'static
{
    tokio::spawn(async move {
        if let Err(error) = task.await {
            warn!("{}", error);
        }
    });
}
