pub mod encoder;
pub mod loader;

pub use encoder::*;
pub use loader::*;
