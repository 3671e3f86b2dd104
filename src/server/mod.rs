pub mod commands;
pub mod dispatcher;

pub use commands::{Commands, PlayOutcome};
