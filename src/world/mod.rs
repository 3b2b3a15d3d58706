pub mod deferred;
pub mod path;
pub mod position;
pub mod state;
pub mod sync;
pub mod tick;
pub mod time;
pub mod viewport;
pub mod zone;
