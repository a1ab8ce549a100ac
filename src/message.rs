//! # Summary
//!
//! Wire types for the agreement protocol. Every message travels as a single
//! line of text, `"<verb> <args...>"`, and is decoded exactly once at the
//! node boundary into a [`Message`].

use std::fmt;
use std::str::FromStr;

use serde_derive::{Deserialize, Serialize};

use crate::error::Error;
use crate::state;

/// Stable identifier of a cluster member: its listening address.
#[derive(Serialize, Deserialize)]
#[serde(transparent)]
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

impl FromStr for NodeId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.contains(char::is_whitespace) {
            return Err(Error::parse(s, "node id must be a single token"))
        }
        Ok(NodeId(s.to_string()))
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

/// Key of one independent single-decree instance, e.g. `create-c1`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(String);

impl InstanceId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        InstanceId(id.into())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}", self.0)
    }
}

impl FromStr for InstanceId {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() || s.contains(char::is_whitespace) {
            return Err(Error::parse(s, "instance id must be a single token"))
        }
        Ok(InstanceId(s.to_string()))
    }
}

impl From<&str> for InstanceId {
    fn from(s: &str) -> Self {
        InstanceId(s.to_string())
    }
}

/// Totally ordered proposal number. Field order matters: the derived
/// ordering compares `round` first and breaks ties on `proposer`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProposalId {
    pub round: u64,
    pub proposer: NodeId,
}

impl ProposalId {
    pub fn new(round: u64, proposer: NodeId) -> Self {
        ProposalId { round, proposer }
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{} {}", self.round, self.proposer)
    }
}

/// Acceptor responses, routed back to the proposer's in-flight round.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply<V> {
    /// Phase 1b: `from` promised `proposal`, reporting what it accepted before.
    Promise {
        from: NodeId,
        proposal: ProposalId,
        prior: Option<(ProposalId, V)>,
    },

    /// Phase 2b: `from` accepted the value proposed under `proposal`.
    Accepted {
        from: NodeId,
        proposal: ProposalId,
    },

    /// `from` has promised `promised`, which outranks `proposal`.
    Reject {
        from: NodeId,
        proposal: ProposalId,
        promised: ProposalId,
    },
}

impl<V> Reply<V> {
    pub fn proposal(&self) -> &ProposalId {
        match self {
        | Reply::Promise { proposal, .. }
        | Reply::Accepted { proposal, .. }
        | Reply::Reject { proposal, .. } => proposal,
        }
    }
}

/// Protocol-level messages exchanged between nodes.
#[derive(Clone, Debug, PartialEq)]
pub enum Message<V> {
    Prepare {
        instance: InstanceId,
        proposal: ProposalId,
    },
    Accept {
        instance: InstanceId,
        proposal: ProposalId,
        value: V,
    },
    Reply {
        instance: InstanceId,
        reply: Reply<V>,
    },
    Commit {
        instance: InstanceId,
        value: V,
    },
    Ping(Option<NodeId>),

    /// Simulated crash: the receiving process terminates immediately.
    Fail,
}

impl<V: fmt::Display> fmt::Display for Message<V> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
        | Message::Prepare { instance, proposal } => {
            write!(fmt, "prepare {} {}", instance, proposal)
        }
        | Message::Accept { instance, proposal, value } => {
            write!(fmt, "accept {} {} {}", instance, proposal, value)
        }
        | Message::Reply { instance, reply: Reply::Promise { from, proposal, prior: None } } => {
            write!(fmt, "promise {} {} {} -", instance, proposal, from)
        }
        | Message::Reply { instance, reply: Reply::Promise { from, proposal, prior: Some((id, value)) } } => {
            write!(fmt, "promise {} {} {} {} {}", instance, proposal, from, id, value)
        }
        | Message::Reply { instance, reply: Reply::Accepted { from, proposal } } => {
            write!(fmt, "accepted {} {} {}", instance, proposal, from)
        }
        | Message::Reply { instance, reply: Reply::Reject { from, proposal, promised } } => {
            write!(fmt, "reject {} {} {} {}", instance, proposal, from, promised)
        }
        | Message::Commit { instance, value } => {
            write!(fmt, "commit {} {}", instance, value)
        }
        | Message::Ping(None) => write!(fmt, "ping"),
        | Message::Ping(Some(from)) => write!(fmt, "ping {}", from),
        | Message::Fail => write!(fmt, "failNode"),
        }
    }
}

impl<V: state::Value> FromStr for Message<V> {
    type Err = Error;
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut tokens = Tokens::new(line);
        let message = match tokens.next("verb")? {
        | "prepare" => Message::Prepare {
            instance: tokens.parse("instance")?,
            proposal: tokens.proposal()?,
        },
        | "accept" => Message::Accept {
            instance: tokens.parse("instance")?,
            proposal: tokens.proposal()?,
            value: tokens.value()?,
        },
        | "promise" => {
            let instance = tokens.parse("instance")?;
            let proposal = tokens.proposal()?;
            let from = tokens.parse("sender")?;
            let prior = match tokens.rest("prior acceptance")? {
            | "-" => None,
            | rest => {
                let mut tokens = Tokens::new(rest);
                Some((tokens.proposal()?, tokens.value()?))
            }
            };
            Message::Reply { instance, reply: Reply::Promise { from, proposal, prior } }
        }
        | "accepted" => {
            let instance = tokens.parse("instance")?;
            let proposal = tokens.proposal()?;
            let from = tokens.parse("sender")?;
            Message::Reply { instance, reply: Reply::Accepted { from, proposal } }
        }
        | "reject" => {
            let instance = tokens.parse("instance")?;
            let proposal = tokens.proposal()?;
            let from = tokens.parse("sender")?;
            let promised = tokens.proposal()?;
            Message::Reply { instance, reply: Reply::Reject { from, proposal, promised } }
        }
        | "commit" => Message::Commit {
            instance: tokens.parse("instance")?,
            value: tokens.value()?,
        },
        | "ping" if tokens.is_empty() => Message::Ping(None),
        | "ping" => Message::Ping(Some(tokens.parse("sender")?)),
        | "failNode" => Message::Fail,
        | verb => return Err(Error::parse(line, format!("unknown verb {:?}", verb))),
        };
        tokens.end()?;
        Ok(message)
    }
}

/// Cursor over the whitespace-separated tokens of one wire line.
pub struct Tokens<'a> {
    line: &'a str,
    rest: &'a str,
}

impl<'a> Tokens<'a> {
    pub fn new(line: &'a str) -> Self {
        Tokens { line, rest: line.trim() }
    }

    pub fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Next single token, naming `what` in the error if it is missing.
    pub fn next(&mut self, what: &str) -> Result<&'a str, Error> {
        if self.rest.is_empty() {
            return Err(Error::parse(self.line, format!("missing {}", what)))
        }
        let (token, rest) = self.rest
            .split_once(char::is_whitespace)
            .unwrap_or((self.rest, ""));
        self.rest = rest.trim_start();
        Ok(token)
    }

    pub fn parse<T>(&mut self, what: &str) -> Result<T, Error>
        where T: FromStr, T::Err: fmt::Display
    {
        let line = self.line;
        self.next(what)?
            .parse()
            .map_err(|error| Error::parse(line, format!("bad {}: {}", what, error)))
    }

    /// Remainder of the line as free text. Must be non-empty.
    pub fn rest(&mut self, what: &str) -> Result<&'a str, Error> {
        if self.rest.is_empty() {
            return Err(Error::parse(self.line, format!("missing {}", what)))
        }
        Ok(std::mem::take(&mut self.rest))
    }

    pub fn end(&self) -> Result<(), Error> {
        if self.rest.is_empty() {
            Ok(())
        } else {
            Err(Error::parse(self.line, format!("unexpected trailing {:?}", self.rest)))
        }
    }

    fn proposal(&mut self) -> Result<ProposalId, Error> {
        let round = self.parse("round")?;
        let proposer = self.parse("proposer")?;
        Ok(ProposalId { round, proposer })
    }

    fn value<V: state::Value>(&mut self) -> Result<V, Error> {
        let line = self.line;
        V::decode(self.rest("value")?)
            .map_err(|error| Error::parse(line, format!("bad value: {}", error)))
    }
}
