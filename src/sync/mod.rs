mod engine;
mod loader;
mod runtime;

pub use engine::{ChatSync, HydrationTicket, MediaUpload, HYDRATION_DEBOUNCE};
pub use runtime::{spawn, Command, SyncHandle};
