use std::path::Path;

use serde_derive::{Deserialize, Serialize};

use crate::error::Error;
use crate::operator::Operator;

/// A scripted operator session, run before the interactive prompt.
#[derive(Serialize, Deserialize)]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Execution(pub Vec<Operator>);

impl Execution {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let file = std::fs::File::open(path)?;
        let execution = serde_json::from_reader(std::io::BufReader::new(file))?;
        Ok(execution)
    }
}
