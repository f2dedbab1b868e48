//! Data types for the flightlog library.

pub mod chat;
pub mod email;
pub mod record;
