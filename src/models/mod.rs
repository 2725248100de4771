pub mod manifest;
pub mod record;

pub use manifest::*;
pub use record::*;
