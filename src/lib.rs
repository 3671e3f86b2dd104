pub mod backend;
pub mod common;
pub mod configs;
pub mod console;
pub mod dashboard;
pub mod player;
pub mod protocol;
pub mod server;
pub mod sources;

#[cfg(test)]
pub(crate) mod testing;
