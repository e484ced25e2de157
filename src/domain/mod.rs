//! Domain layer for MISRA Gate
//!
//! CDD Principle: Domain Model - Pure logic for deciding which violations are new
//! - Contains the violation value objects, classification outcomes and the run report
//! - Independent of how reports, configs or source files are read

pub mod violations;

// Re-export main domain types for convenience
pub use violations::*;
