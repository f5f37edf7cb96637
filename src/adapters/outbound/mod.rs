pub mod loggers;
pub mod negotiators;
pub mod policies;

pub use loggers::*;
pub use negotiators::*;
pub use policies::*;
