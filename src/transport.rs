//! # Summary
//!
//! Outbound seam of a node. Nodes never talk to each other directly: every
//! line goes through a [`Transport`], which in a deployment is the
//! fault-injecting router.

use crate::message::NodeId;
use crate::socket;

/// Fire-and-forget delivery of wire lines. Implementations must not block
/// on the destination and never report delivery failures to the caller.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, dest: &NodeId, line: String);
}

/// Sends every line to the router wrapped in a `"<src> <dest> <line>"` envelope.
#[derive(Clone, Debug)]
pub struct RouterTransport {
    id: NodeId,
    router: String,
}

impl RouterTransport {
    pub fn new(id: NodeId, router: String) -> Self {
        RouterTransport { id, router }
    }
}

impl Transport for RouterTransport {
    fn send(&self, dest: &NodeId, line: String) {
        let envelope = format!("{} {} {}", self.id, dest, line);
        let router = self.router.clone();
        trace!("sending {:?}", envelope);
        tokio::spawn(async move {
            if let Err(error) = socket::send_line(&router, envelope).await {
                warn!("router {} unreachable: {}", router, error);
            }
        });
    }
}
