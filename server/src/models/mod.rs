pub mod event;
pub mod patch;
pub mod subscription;
pub mod timestamp;
pub mod user;

pub use event::{Event, EventFilters, EventPatch, EventQuery, ListedEvent, NewEvent};
pub use patch::Patch;
pub use subscription::Subscription;
pub use timestamp::Timestamp;
pub use user::User;
