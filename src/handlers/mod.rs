pub mod incidents;
pub mod shared;
pub mod shifts;
pub mod system;
