//! Lavalink v4 wire types, from the client's side of the link.

pub mod events;
pub mod models;
pub mod tracks;

pub use events::*;
pub use models::*;
pub use tracks::*;
