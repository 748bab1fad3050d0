//! Utility modules: developer log sink, JSON to BSON conversion, logger setup, numeric helpers.
pub mod devlog;
pub mod json;
pub mod logger;
pub mod num;
