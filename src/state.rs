use std::fmt;
use std::str::FromStr;

use crate::message::InstanceId;

/// Value decided by an instance. Must render to, and decode from, a single
/// line of text since it travels inside `accept`, `promise` and `commit`.
pub trait Value: Clone
    + fmt::Debug
    + fmt::Display
    + PartialEq
    + Send
    + Sync
    + 'static
{
    fn decode(text: &str) -> Result<Self, String>;
}

impl<T> Value for T where T: Clone
    + fmt::Debug
    + fmt::Display
    + FromStr
    + PartialEq
    + Send
    + Sync
    + 'static,
    T::Err: fmt::Display,
{
    fn decode(text: &str) -> Result<Self, String> {
        text.parse().map_err(|error: T::Err| error.to_string())
    }
}

/// Replicated state machine. Only ever mutated by chosen values.
pub trait State: Default + Send + 'static {
    type Value: Value;

    /// Applies the value chosen for `instance`. Called at most once per
    /// instance on each node.
    fn execute(&mut self, instance: &InstanceId, value: Self::Value);
}
