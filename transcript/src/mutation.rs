use std::fmt;
use std::str::FromStr;

use synod::message::Tokens;

use crate::error::Error;

/// The only agreed changes to the context store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Mutation {
    /// Start an empty transcript
    Create { context: String },

    /// Append one `Answer:` line
    Answer { context: String, text: String },
}

impl fmt::Display for Mutation {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
        | Mutation::Create { context } => write!(fmt, "create {}", context),
        | Mutation::Answer { context, text } => write!(fmt, "answer {} {}", context, text),
        }
    }
}

impl FromStr for Mutation {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut tokens = Tokens::new(s);
        let mutation = match tokens.next("mutation")? {
        | "create" => Mutation::Create {
            context: tokens.next("context")?.to_string(),
        },
        | "answer" => Mutation::Answer {
            context: tokens.next("context")?.to_string(),
            text: tokens.rest("answer")?.to_string(),
        },
        | kind => {
            return Err(Error::Parse {
                line: s.to_string(),
                reason: format!("unknown mutation {:?}", kind),
            })
        }
        };
        tokens.end()?;
        Ok(mutation)
    }
}
