//! API request handlers.

pub mod permit;
