pub mod clock;
pub mod incident;
mod macros;
pub mod shift;

pub use incident::*;
pub use shift::*;
