//! Event routing.

pub mod bus;
