//! # Summary
//!
//! The replicated context store. Transcripts are append-only. `create`
//! and `answer` mutations only arrive through committed decisions; query
//! staging and the candidate table are local bookkeeping that is never
//! agreed on.
//!
//! Reads are served from local state without a read quorum, so a node cut
//! off from the leader keeps serving its last known transcript until a
//! later commit reaches it.

use std::collections::BTreeMap;
use std::fmt;

use hashbrown::HashMap as Map;
use synod::{InstanceId, NodeId};

use crate::mutation::Mutation;

/// One transcript line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Line {
    Query(String),
    Answer(String),
}

impl fmt::Display for Line {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
        | Line::Query(text) => write!(fmt, "Query: {}", text),
        | Line::Answer(text) => write!(fmt, "Answer: {}", text),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Context {
    lines: Vec<Line>,

    /// Number of committed answers, which numbers the next choose instance
    answers: usize,
}

impl Context {
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn answers(&self) -> usize {
        self.answers
    }

    /// Transcript text as fed to the answer backend.
    pub fn transcript(&self) -> String {
        self.lines
            .iter()
            .map(Line::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(Debug, Default)]
pub struct Store {
    contexts: BTreeMap<String, Context>,

    /// Leader-local candidate answers of the current round, per context.
    /// The round of a context is its number of committed answers.
    candidates: Map<String, BTreeMap<NodeId, String>>,
}

impl Store {
    /// Idempotent. Returns whether the context was new.
    pub fn create_context(&mut self, context: &str) -> bool {
        if self.contexts.contains_key(context) {
            return false
        }
        self.contexts.insert(context.to_string(), Context::default());
        true
    }

    /// Appends a local `Query:` line. Returns the round the query belongs
    /// to and the transcript including it.
    pub fn stage_query(&mut self, context: &str, text: &str) -> Option<(usize, String)> {
        let entry = self.contexts.get_mut(context)?;
        entry.lines.push(Line::Query(text.to_string()));
        Some((entry.answers, entry.transcript()))
    }

    /// Records `node`'s answer for `round` of `context`. Answers produced
    /// for any other round are dropped. Returns whether it was recorded.
    pub fn record_candidate(&mut self, context: &str, round: usize, node: NodeId, answer: String) -> bool {
        match self.contexts.get(context) {
        | Some(entry) if entry.answers == round => (),
        | _ => return false,
        }
        self.candidates
            .entry(context.to_string())
            .or_default()
            .insert(node, answer);
        true
    }

    pub fn candidate(&self, context: &str, node: &NodeId) -> Option<&str> {
        self.candidates
            .get(context)
            .and_then(|candidates| candidates.get(node))
            .map(String::as_str)
    }

    pub fn candidates(&self, context: &str) -> Option<&BTreeMap<NodeId, String>> {
        self.candidates.get(context)
    }

    /// Appends an agreed answer and closes the candidate round. A node that
    /// missed the create still records the answer under a fresh context.
    pub fn commit_answer(&mut self, context: &str, text: &str) {
        let entry = self.contexts.entry(context.to_string()).or_default();
        entry.lines.push(Line::Answer(text.to_string()));
        entry.answers += 1;
        self.candidates.remove(context);
    }

    pub fn context(&self, context: &str) -> Option<&Context> {
        self.contexts.get(context)
    }

    pub fn view(&self, context: &str) -> Option<String> {
        self.contexts
            .get(context)
            .map(|entry| render(context, entry))
    }

    pub fn view_all(&self) -> String {
        let mut out = String::from("======= ALL CONTEXTS =======\n");
        for (context, entry) in &self.contexts {
            out.push_str(&render(context, entry));
            out.push('\n');
        }
        out.push_str("================================");
        out
    }
}

fn render(context: &str, entry: &Context) -> String {
    format!(
        "-------- CONTEXT {} --------\n{}\n-------------------------------",
        context,
        entry.transcript(),
    )
}

impl synod::State for Store {
    type Value = Mutation;
    fn execute(&mut self, instance: &InstanceId, mutation: Mutation) {
        match mutation {
        | Mutation::Create { context } => {
            if !self.create_context(&context) {
                debug!("{}: context {} already exists", instance, context);
            }
        }
        | Mutation::Answer { context, text } => self.commit_answer(&context, &text),
        }
    }
}
