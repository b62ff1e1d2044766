//! Domain models for the clinic desk.

mod invoice;
mod page;
mod patient;
mod staff;
mod stats;
mod visit;

pub use invoice::*;
pub use page::*;
pub use patient::*;
pub use staff::*;
pub use stats::*;
pub use visit::*;
