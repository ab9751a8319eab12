mod manifest;
mod memory;

pub use manifest::ManifestError;
pub use memory::{StaticDirectory, StaticDirectoryBuilder};
