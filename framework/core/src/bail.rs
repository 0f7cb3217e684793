/// Return this error from a virtual user's behaviour to stop that user without stopping the run.
///
/// Use it when a user hits a condition it cannot recover from, for example the target API is
/// rejecting everything it sends. The remaining users keep running their scenario.
#[derive(derive_more::Error, derive_more::Display, Debug)]
pub struct UserBailError {
    msg: String,
}

impl Default for UserBailError {
    fn default() -> Self {
        Self {
            msg: "Virtual user is bailing".to_string(),
        }
    }
}
