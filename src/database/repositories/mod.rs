pub mod shift;

pub use shift::{IncidentChange, ShiftRepository};
