//! Identity and addressing types

mod handle;
mod id;

pub use handle::{FileType, Handle};
pub use id::Id;
