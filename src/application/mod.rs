//! Application layer containing the kiosk's business logic orchestration.
//!
//! Each component owns one concern (catalog, pricing, order lifecycle,
//! inventory, deposit recycling, metrics) and talks to storage only through
//! the injected `StoreHandle`. `Kiosk` wires them together and is the primary
//! entry point.

pub mod catalog;
pub mod customers;
pub mod inventory;
pub mod kiosk;
pub mod lifecycle;
pub mod metrics;
pub mod pricing;
pub mod recycling;
