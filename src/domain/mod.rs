//! Domain layer: value types, wire contracts and the ports the application
//! layer talks through.

pub mod access;
pub mod payment;
pub mod phone;
pub mod ports;
