//! Pure helpers shared by state modules.

pub mod debounce;
pub mod language;
pub mod validation;
