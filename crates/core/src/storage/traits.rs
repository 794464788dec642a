use crate::errors::Result;

/// String-valued key-value storage that survives restarts.
///
/// Implementations must be safe to share between the orchestrator's tasks.
pub trait KeyValueStore: Send + Sync {
    /// Returns the stored value, or `None` if the key was never written.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<()>;
}
