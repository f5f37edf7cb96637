pub mod events;
pub mod ports;
pub mod session;
pub mod types;

pub use events::*;
pub use ports::*;
pub use session::*;
pub use types::*;
