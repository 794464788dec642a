//! Durable key-value storage.
//!
//! Two string keys live here: the watchlist and the theme preference. Each
//! key is read once at startup and written on every relevant change; there
//! are no multi-key transactions.

mod file;
mod memory;
mod traits;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use traits::KeyValueStore;
