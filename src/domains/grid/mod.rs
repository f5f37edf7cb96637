pub mod distance;
pub mod events;
pub mod projections;
pub mod types;
pub mod world;

pub use distance::*;
pub use events::*;
pub use projections::*;
pub use types::*;
pub use world::*;
