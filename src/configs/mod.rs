pub mod base;
pub mod lavalink;
pub mod logging;
pub mod player;

pub use base::*;
pub use lavalink::*;
pub use logging::*;
pub use player::*;
