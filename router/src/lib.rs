#[macro_use]
extern crate log;

mod envelope;
mod error;
mod links;
mod operator;
mod router;
mod script;

pub use crate::envelope::{Envelope, Inbound};
pub use crate::error::Error;
pub use crate::links::FailedLinks;
pub use crate::operator::{Operator, USAGE};
pub use crate::router::{Deliver, Router, TcpDeliver, OPERATOR};
pub use crate::script::Execution;
