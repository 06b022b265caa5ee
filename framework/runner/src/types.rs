/// Result type used across the runner. Errors carry their context chain up to `main`.
pub type RunbenchResult<T> = anyhow::Result<T>;
