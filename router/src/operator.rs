//! # Summary
//!
//! Commands accepted from the operator, either typed at the router's prompt,
//! sent over TCP, or listed in a JSON script. Scripts use the same variants
//! tagged by `type`, for example
//!
//! ```json
//! [
//!     { "type": "Create", "context": "c1" },
//!     { "type": "FailLink", "src": "127.0.0.1:7000", "dest": "127.0.0.1:7002" },
//!     { "type": "Sleep", "ms": 500 }
//! ]
//! ```

use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};
use synod::message::Tokens;
use synod::NodeId;

pub const USAGE: &str = "\
commands:
    failLink <src> <dest>      drop traffic from src to dest
    fixLink <src> <dest>       restore traffic from src to dest
    failNode <node>            terminate a node
    create <context>           create a context on every node
    query <context> <text>     ask every node for a candidate answer
    choose <context> <node>    commit node's candidate as the next answer
    view <context>             print a context on every node
    viewall                    print all contexts on every node
    links                      list failed links
    sleep <ms>                 pause before the next command
    help                       show this message";

const VERBS: [&str; 11] = [
    "failLink", "fixLink", "failNode", "create", "query", "choose",
    "view", "viewall", "links", "sleep", "help",
];

#[derive(Serialize, Deserialize)]
#[serde(tag = "type")]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    /// Drop every message sent from `src` to `dest`
    FailLink {
        src: NodeId,
        dest: NodeId,
    },

    /// Deliver messages from `src` to `dest` again
    FixLink {
        src: NodeId,
        dest: NodeId,
    },

    /// Make the node terminate
    FailNode {
        id: NodeId,
    },

    Create {
        context: String,
    },

    Query {
        context: String,
        text: String,
    },

    Choose {
        context: String,
        node: NodeId,
    },

    View {
        context: String,
    },

    ViewAll,

    /// List failed links
    Links,

    /// Pause for `ms` milliseconds
    Sleep {
        ms: u64,
    },

    Help,
}

impl Operator {
    pub fn is_verb(verb: &str) -> bool {
        VERBS.contains(&verb)
    }

    /// The line broadcast to every node for client commands.
    pub fn client_line(&self) -> Option<String> {
        match self {
        | Operator::Create { .. }
        | Operator::Query { .. }
        | Operator::Choose { .. }
        | Operator::View { .. }
        | Operator::ViewAll => Some(self.to_string()),
        | _ => None,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
        | Operator::FailLink { src, dest } => write!(fmt, "failLink {} {}", src, dest),
        | Operator::FixLink { src, dest } => write!(fmt, "fixLink {} {}", src, dest),
        | Operator::FailNode { id } => write!(fmt, "failNode {}", id),
        | Operator::Create { context } => write!(fmt, "create {}", context),
        | Operator::Query { context, text } => write!(fmt, "query {} {}", context, text),
        | Operator::Choose { context, node } => write!(fmt, "choose {} {}", context, node),
        | Operator::View { context } => write!(fmt, "view {}", context),
        | Operator::ViewAll => write!(fmt, "viewall"),
        | Operator::Links => write!(fmt, "links"),
        | Operator::Sleep { ms } => write!(fmt, "sleep {}", ms),
        | Operator::Help => write!(fmt, "help"),
        }
    }
}

impl FromStr for Operator {
    type Err = synod::Error;
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = Tokens::new(line);
        let operator = match tokens.next("command")? {
        | "failLink" => Operator::FailLink {
            src: tokens.parse("source")?,
            dest: tokens.parse("destination")?,
        },
        | "fixLink" => Operator::FixLink {
            src: tokens.parse("source")?,
            dest: tokens.parse("destination")?,
        },
        | "failNode" => Operator::FailNode {
            id: tokens.parse("node")?,
        },
        | "create" => Operator::Create {
            context: tokens.next("context")?.to_string(),
        },
        | "query" => Operator::Query {
            context: tokens.next("context")?.to_string(),
            text: tokens.rest("query text")?.to_string(),
        },
        | "choose" => Operator::Choose {
            context: tokens.next("context")?.to_string(),
            node: tokens.parse("node")?,
        },
        | "view" => Operator::View {
            context: tokens.next("context")?.to_string(),
        },
        | "viewall" => Operator::ViewAll,
        | "links" => Operator::Links,
        | "sleep" => Operator::Sleep {
            ms: tokens.parse("milliseconds")?,
        },
        | "help" => Operator::Help,
        | verb => {
            return Err(synod::Error::Parse {
                line: line.to_string(),
                reason: format!("unknown command {:?}", verb),
            })
        }
        };
        tokens.end()?;
        Ok(operator)
    }
}
