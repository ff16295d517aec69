/// Error type for the runner's entry points and the binary's `main`. Configuration and startup
/// problems surface through it, per-marker delivery problems never do.
pub type LockstepResult<T> = anyhow::Result<T>;
