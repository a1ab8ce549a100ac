use std::fmt;
use std::str::FromStr;

use synod::message::Tokens;
use synod::NodeId;

use crate::operator::Operator;

/// A node-to-node line as relayed by the router: `"<src> <dest> <message>"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub src: NodeId,
    pub dest: NodeId,
    pub message: String,
}

impl fmt::Display for Envelope {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{} {} {}", self.src, self.dest, self.message)
    }
}

impl FromStr for Envelope {
    type Err = synod::Error;
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = Tokens::new(line);
        Ok(Envelope {
            src: tokens.parse("source")?,
            dest: tokens.parse("destination")?,
            message: tokens.rest("message")?.to_string(),
        })
    }
}

/// Any line arriving on the router's listening socket.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    Operator(Operator),
    Envelope(Envelope),
}

impl FromStr for Inbound {
    type Err = synod::Error;
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let verb = line.split_whitespace().next().unwrap_or("");
        if Operator::is_verb(verb) {
            line.parse().map(Inbound::Operator)
        } else {
            line.parse().map(Inbound::Envelope)
        }
    }
}
