pub mod page;

pub use page::{Page, PageLookup, PageSnapshot};
