//! Single-decree Paxos for a small, fixed cluster.
//!
//! Every node runs an acceptor; the statically configured leader also runs
//! the proposer. Each logical decision is its own instance, identified by a
//! string key, and is decided at most once. Decided values are applied to a
//! user-supplied replicated [`State`] on every node that receives the commit.

#[macro_use]
extern crate derivative;

#[macro_use]
extern crate log;

mod acceptor;
mod config;
mod error;
mod internal;
pub mod logger;
pub mod message;
mod node;
mod proposer;
pub mod socket;
mod state;
pub mod transport;

pub use crate::acceptor::Instance;
pub use crate::config::Config;
pub use crate::error::Error;
pub use crate::message::{InstanceId, Message, NodeId, ProposalId, Reply};
pub use crate::node::{Control, Node};
pub use crate::state::{State, Value};
pub use crate::transport::{RouterTransport, Transport};
