//! Reusable originator capabilities.

mod page;

pub use page::PageMaxAge;
