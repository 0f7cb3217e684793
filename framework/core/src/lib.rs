mod bail;
mod shutdown;

pub mod prelude {
    pub use crate::bail::UserBailError;
    pub use crate::shutdown::{ShutdownHandle, ShutdownListener, ShutdownSignalError};
}
