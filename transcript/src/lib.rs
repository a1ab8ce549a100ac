//! Per-topic transcripts replicated across a three node cluster.
//!
//! Creating a context and committing a chosen answer are each decided by
//! their own single-decree instance; queries and candidate answers are
//! local staging that feeds the answer backend.

#[macro_use]
extern crate log;

mod context;
mod error;
mod mutation;
pub mod oracle;
mod request;
mod server;

pub use crate::context::{Context, Line, Store};
pub use crate::error::Error;
pub use crate::mutation::Mutation;
pub use crate::oracle::{CommandOracle, NoOracle, Oracle};
pub use crate::request::Request;
pub use crate::server::{choose_instance, create_instance, Server};
