//! The core module holds the error type and the settings used to configure composition.

pub mod error;
pub mod settings;
