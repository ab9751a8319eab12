//! Shared juxta data models consumed by the core library and directory crates.

pub mod compare;
pub mod diff;
pub mod excerpt;
pub mod repository;

pub use compare::*;
pub use diff::*;
pub use excerpt::*;
pub use repository::*;
