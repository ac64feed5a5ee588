//! Derived statistics and the fetch log.

pub mod aggregate;
pub mod logger;
pub mod reporter;
