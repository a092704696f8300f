//! Pure narration rules: voice matching, scripts and rates.

pub mod rate;
pub mod script;
pub mod voice_selection;
