//! elyte: Electrolyte Conductivity Modeling Library
//!
//! Predicts the ionic conductivity of liquid electrolyte formulations,
//! ranks the features that drive it through correlation and tree
//! attribution, compares regression backends on full and reduced feature
//! sets, and summarizes the conditions of the most conductive samples.

pub mod cli;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod utils;
