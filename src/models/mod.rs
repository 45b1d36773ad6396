pub mod disposition;
pub mod endpoint;

pub use disposition::*;
pub use endpoint::*;
