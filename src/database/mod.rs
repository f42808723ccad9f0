pub mod connection;
pub mod models;
pub mod repository;

pub use connection::{ConnectionSource, DatabaseError, PoolStats};
pub use models::{Page, PageLookup, PageSnapshot};
pub use repository::{PageRepository, PageStore};
