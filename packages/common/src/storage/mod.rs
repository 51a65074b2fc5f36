mod error;
mod kind;
mod traits;

pub mod filesystem;

pub use error::StorageError;
pub use kind::{MediaKind, new_stem};
pub use traits::{BoxReader, MediaStore};
