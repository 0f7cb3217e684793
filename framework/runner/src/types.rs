/// Recommended error type for a scenario's `main` function and shared hook code. Compatible
/// with [crate::definition::HookResult] so `?` propagates either way.
pub type FleetloadResult<T> = anyhow::Result<T>;
