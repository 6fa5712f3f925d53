//! Core types for the Cosmo content engine: identifiers, fixed-point numbers,
//! the universe object model, scope conditions, value expressions and the
//! effects-group evaluation pass that content declares against.

pub mod condition;
pub mod effect;
pub mod fixed;
pub mod id;
pub mod universe;
pub mod value_ref;
