//! Request and response bodies

pub mod booking;

pub use booking::*;
