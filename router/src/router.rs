//! # Summary
//!
//! The fault-injecting relay every node sends through. Nodes address
//! envelopes to each other; the router forwards them unless the directed
//! link is marked failed, in which case the message is dropped without
//! notice. Operator commands come in on the same socket or from the prompt.

use parking_lot::RwLock;

use synod::NodeId;

use crate::envelope::{Envelope, Inbound};
use crate::error::Error;
use crate::links::FailedLinks;
use crate::operator::{Operator, USAGE};

/// Source identity of everything the operator sends.
pub const OPERATOR: &str = "operator";

/// Last hop of a routed message.
pub trait Deliver: Send + Sync + 'static {
    fn deliver(&self, dest: &NodeId, line: String);
}

/// Opens a fresh connection to the destination for every message.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpDeliver;

impl Deliver for TcpDeliver {
    fn deliver(&self, dest: &NodeId, line: String) {
        let dest = dest.clone();
        tokio::spawn(async move {
            if let Err(error) = synod::socket::send_line(dest.as_str(), line).await {
                debug!("could not reach {}: {}", dest, error);
            }
        });
    }
}

pub struct Router<D> {
    members: Vec<NodeId>,
    operator: NodeId,
    links: RwLock<FailedLinks>,
    deliver: D,
}

impl<D: Deliver> Router<D> {
    pub fn new(members: Vec<NodeId>, deliver: D) -> Self {
        Router {
            members,
            operator: NodeId::from(OPERATOR),
            links: RwLock::new(FailedLinks::default()),
            deliver,
        }
    }

    pub fn deliverer(&self) -> &D {
        &self.deliver
    }

    /// Forwards `message` unless `src -> dest` is failed. Returns whether
    /// the message was handed to the destination.
    pub fn route(&self, src: &NodeId, dest: &NodeId, message: String) -> bool {
        if !self.members.contains(dest) {
            warn!("dropping message for unknown member {}", dest);
            return false
        }
        if self.links.read().is_blocked(src, dest) {
            debug!("dropped {} -> {}: {}", src, dest, message);
            return false
        }
        trace!("{} -> {}: {}", src, dest, message);
        self.deliver.deliver(dest, message);
        true
    }

    /// Sends `message` from the operator to every member.
    pub fn broadcast(&self, message: &str) {
        for member in &self.members {
            self.route(&self.operator, member, message.to_string());
        }
    }

    pub fn block(&self, src: NodeId, dest: NodeId) -> Result<bool, Error> {
        self.check(&src)?;
        self.check(&dest)?;
        Ok(self.links.write().block(src, dest))
    }

    pub fn unblock(&self, src: &NodeId, dest: &NodeId) -> Result<bool, Error> {
        self.check(src)?;
        self.check(dest)?;
        Ok(self.links.write().unblock(src, dest))
    }

    /// Tells `id` to terminate. Subject to link failures like any other message.
    pub fn kill(&self, id: &NodeId) -> Result<(), Error> {
        self.check(id)?;
        self.route(&self.operator, id, "failNode".to_string());
        Ok(())
    }

    pub fn links(&self) -> FailedLinks {
        self.links.read().clone()
    }

    /// Runs one operator command. Returns text to show the operator, if any.
    pub async fn execute(&self, operator: Operator) -> Result<Option<String>, Error> {
        if let Some(line) = operator.client_line() {
            self.broadcast(&line);
            return Ok(None)
        }
        let output = match operator {
        | Operator::FailLink { src, dest } => {
            let output = format!("failed link {} -> {}", src, dest);
            if !self.block(src, dest)? {
                debug!("link was already failed");
            }
            Some(output)
        }
        | Operator::FixLink { src, dest } => {
            if !self.unblock(&src, &dest)? {
                debug!("link was not failed");
            }
            Some(format!("fixed link {} -> {}", src, dest))
        }
        | Operator::FailNode { id } => {
            self.kill(&id)?;
            Some(format!("failed node {}", id))
        }
        | Operator::Links => Some(self.links().to_string()),
        | Operator::Sleep { ms } => {
            tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
            None
        }
        | Operator::Help => Some(USAGE.to_string()),
        | Operator::Create { .. }
        | Operator::Query { .. }
        | Operator::Choose { .. }
        | Operator::View { .. }
        | Operator::ViewAll => None,
        };
        Ok(output)
    }

    /// Handles one line received on the router's socket.
    pub async fn handle_line(&self, line: &str) {
        match line.parse::<Inbound>() {
        | Ok(Inbound::Envelope(Envelope { src, dest, message })) => {
            self.route(&src, &dest, message);
        }
        | Ok(Inbound::Operator(operator)) => match self.execute(operator).await {
        | Ok(Some(output)) => info!("{}", output),
        | Ok(None) => (),
        | Err(error) => warn!("{}", error),
        },
        | Err(error) => warn!("ignoring {}", error),
        }
    }

    fn check(&self, id: &NodeId) -> Result<(), Error> {
        if *id == self.operator || self.members.contains(id) {
            Ok(())
        } else {
            Err(Error::UnknownMember(id.clone()))
        }
    }
}
