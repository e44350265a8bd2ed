//! Domain types and the storage ports the application layer depends on.

pub mod catalog;
pub mod customer;
pub mod dispense;
pub mod money;
pub mod order;
pub mod ports;
pub mod recycle;
