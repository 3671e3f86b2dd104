pub mod queue;
pub mod registry;
pub mod session;
pub mod state;
pub mod timer;
pub mod track;

pub use queue::TrackQueue;
pub use registry::SessionRegistry;
pub use session::{Enqueued, GuildSession};
pub use state::*;
pub use timer::DeadlineTimer;
pub use track::Track;
