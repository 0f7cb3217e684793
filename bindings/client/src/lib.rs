mod client;
mod error;
mod poll;
mod resource;

pub mod prelude {
    pub use crate::client::{ResourceClient, UpdateOutcome};
    pub use crate::error::ClientError;
    pub use crate::poll::{await_condition, PollOutcome, DEFAULT_DEADLINE, POLL_INTERVAL};
    pub use crate::resource::{
        AllocationState, ObservedStatus, ResourceDocument, ResourceRef, ResourceVersion,
    };
}
