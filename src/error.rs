use crate::domain::order::OrderStatus;
use miette::Diagnostic;
use thiserror::Error;
use uuid::Uuid;

pub type Result<T> = std::result::Result<T, KioskError>;

/// Coarse error classes reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    NotFound,
    InvalidState,
    InsufficientStock,
    AlreadyFullyRefunded,
    StorageFailure,
}

#[derive(Error, Diagnostic, Debug)]
pub enum KioskError {
    #[error("Validation error: {0}")]
    #[diagnostic(code(kiosk::validation))]
    ValidationError(String),

    #[error("Order has no items")]
    #[diagnostic(code(kiosk::validation))]
    EmptyOrder,

    #[error("Member not found: {0}")]
    #[diagnostic(code(kiosk::not_found))]
    MemberNotFound(String),

    #[error("Item not found: {0}")]
    #[diagnostic(code(kiosk::not_found))]
    ItemNotFound(String),

    #[error("Line item not found in catalog: {0}")]
    #[diagnostic(code(kiosk::not_found))]
    LineItemNotFound(String),

    #[error("Order not found: {0}")]
    #[diagnostic(code(kiosk::not_found))]
    OrderNotFound(Uuid),

    #[error("Receipt does not match any order line: {0}")]
    #[diagnostic(code(kiosk::not_found))]
    ReceiptNotFound(String),

    #[error("Item {0} carries no deposit")]
    #[diagnostic(code(kiosk::validation))]
    NoDepositOnItem(String),

    #[error("Order {order_id} is {status}, cannot {action}")]
    #[diagnostic(code(kiosk::invalid_state))]
    InvalidState {
        order_id: Uuid,
        status: OrderStatus,
        action: &'static str,
    },

    #[error("Insufficient stock for {item_id}: requested {requested}, available {available}")]
    #[diagnostic(code(kiosk::insufficient_stock))]
    StockInsufficient {
        item_id: String,
        requested: u32,
        available: u32,
    },

    #[error("Item {item_id} on order {order_id} is already fully refunded")]
    #[diagnostic(code(kiosk::already_refunded))]
    AlreadyFullyRefunded { order_id: Uuid, item_id: String },

    #[error("Storage error: {0}")]
    #[diagnostic(code(kiosk::storage))]
    StorageError(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("CSV error: {0}")]
    #[diagnostic(code(kiosk::validation))]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    #[diagnostic(code(kiosk::storage))]
    IoError(#[from] std::io::Error),
}

impl KioskError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::ValidationError(_)
            | Self::EmptyOrder
            | Self::NoDepositOnItem(_)
            | Self::CsvError(_) => ErrorClass::Validation,
            Self::MemberNotFound(_)
            | Self::ItemNotFound(_)
            | Self::LineItemNotFound(_)
            | Self::OrderNotFound(_)
            | Self::ReceiptNotFound(_) => ErrorClass::NotFound,
            Self::InvalidState { .. } => ErrorClass::InvalidState,
            Self::StockInsufficient { .. } => ErrorClass::InsufficientStock,
            Self::AlreadyFullyRefunded { .. } => ErrorClass::AlreadyFullyRefunded,
            Self::StorageError(_) | Self::IoError(_) => ErrorClass::StorageFailure,
        }
    }

    pub(crate) fn storage(message: impl Into<String>) -> Self {
        Self::StorageError(Box::new(std::io::Error::other(message.into())))
    }
}

impl From<serde_json::Error> for KioskError {
    fn from(e: serde_json::Error) -> Self {
        Self::StorageError(Box::new(e))
    }
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for KioskError {
    fn from(e: rocksdb::Error) -> Self {
        Self::StorageError(Box::new(e))
    }
}
