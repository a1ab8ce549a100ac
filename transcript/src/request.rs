use std::fmt;
use std::str::FromStr;

use synod::message::Tokens;
use synod::{Message, NodeId};

use crate::error::Error;
use crate::mutation::Mutation;

/// Everything a node accepts on its boundary, decoded once per line.
#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    Create { context: String },
    Query { context: String, text: String },
    Choose { context: String, node: NodeId },

    /// A follower's candidate answer for one round, forwarded to the leader
    Candidate { context: String, round: usize, node: NodeId, answer: String },

    View { context: String },
    ViewAll,

    /// Agreement traffic and process control
    Protocol(Message<Mutation>),
}

impl fmt::Display for Request {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
        | Request::Create { context } => write!(fmt, "create {}", context),
        | Request::Query { context, text } => write!(fmt, "query {} {}", context, text),
        | Request::Choose { context, node } => write!(fmt, "choose {} {}", context, node),
        | Request::Candidate { context, round, node, answer } => {
            write!(fmt, "candidate {} {} {} {}", context, round, node, answer)
        }
        | Request::View { context } => write!(fmt, "view {}", context),
        | Request::ViewAll => write!(fmt, "viewall"),
        | Request::Protocol(message) => write!(fmt, "{}", message),
        }
    }
}

impl FromStr for Request {
    type Err = Error;
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = Tokens::new(line);
        let request = match tokens.next("verb")? {
        | "create" => Request::Create {
            context: tokens.next("context")?.to_string(),
        },
        | "query" => Request::Query {
            context: tokens.next("context")?.to_string(),
            text: tokens.rest("query text")?.to_string(),
        },
        | "choose" => Request::Choose {
            context: tokens.next("context")?.to_string(),
            node: tokens.parse("node")?,
        },
        | "candidate" => Request::Candidate {
            context: tokens.next("context")?.to_string(),
            round: tokens.parse("round")?,
            node: tokens.parse("node")?,
            answer: tokens.rest("answer")?.to_string(),
        },
        | "view" => Request::View {
            context: tokens.next("context")?.to_string(),
        },
        | "viewall" => Request::ViewAll,
        | _ => return Ok(Request::Protocol(line.parse()?)),
        };
        tokens.end()?;
        Ok(request)
    }
}
