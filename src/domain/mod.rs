//! Domain types and the ports the engine talks to.

pub mod ports;
pub mod principal;
pub mod transaction;
pub mod work;
