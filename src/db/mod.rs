pub mod sqlite;

pub use sqlite::{SqliteStore, StorageError};
