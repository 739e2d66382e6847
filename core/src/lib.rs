pub mod analysis;
pub mod entry;
pub mod error;
pub mod prompt;
