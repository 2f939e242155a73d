//! Player runtime: a dedicated thread that owns the [`Session`] and acts as
//! its event loop.
//!
//! [`PlayerHandle`] lives on the caller's thread and talks to the player
//! thread over channels: commands go in, frame feedback comes out.
//!
//! [`Session`]: crate::session::Session

mod commands;
mod handle;
mod player_thread;

pub use commands::{FrameState, PlayerCmd, PlayerFeedback};
pub use handle::PlayerHandle;
