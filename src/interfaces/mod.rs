//! Adapters between the outside world and the kiosk core.

pub mod csv;
