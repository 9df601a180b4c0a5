pub mod events;
pub mod pending;
pub mod reconciler;

pub use events::{AttendeeRow, Change, ChangeEvent, ChangeOp, CityEventRow};
pub use pending::{PendingBuffer, PendingChild, PENDING_CAP};
pub use reconciler::{apply, FollowUp};
