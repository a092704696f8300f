//! Pure lesson types and rules.

pub mod endpoints;
pub mod lesson;
pub mod normalizer;
