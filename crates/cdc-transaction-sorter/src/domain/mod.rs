//! Domain module for the transaction sorter
//!
//! Contains the sorter state machine, entities, value objects, errors and
//! invariants.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod sorter;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use sorter::{Sorter, SKIP_TRANS_LOG};
pub use value_objects::*;
