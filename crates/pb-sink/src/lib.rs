pub mod local;
pub mod sheets;

pub use local::*;
pub use sheets::*;
