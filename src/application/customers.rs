use crate::domain::customer::Customer;
use crate::domain::ports::{CustomerStore, StoreHandle};
use crate::error::{KioskError, Result};

/// Resolves member numbers to active members.
#[derive(Clone)]
pub struct CustomerDirectory {
    store: StoreHandle,
}

impl CustomerDirectory {
    pub fn new(store: StoreHandle) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, member_no: &str) -> Result<Customer> {
        if member_no.trim().is_empty() {
            return Err(KioskError::ValidationError(
                "member number required".to_string(),
            ));
        }
        self.store
            .find_by_member_no(member_no)
            .await?
            .filter(Customer::is_active)
            .ok_or_else(|| KioskError::MemberNotFound(member_no.trim().to_string()))
    }

    /// A blank or absent member number means an anonymous customer.
    pub async fn resolve_optional(&self, member_no: Option<&str>) -> Result<Option<Customer>> {
        match member_no.map(str::trim) {
            Some(member_no) if !member_no.is_empty() => self.resolve(member_no).await.map(Some),
            _ => Ok(None),
        }
    }
}
