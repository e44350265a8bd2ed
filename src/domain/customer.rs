use super::money::Cents;
use serde::{Deserialize, Serialize};

pub type CustomerId = u64;

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq, Clone, Copy, Default)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    #[default]
    Active,
    Inactive,
}

/// A registered kiosk member.
///
/// Members are registered elsewhere; the kiosk only resolves them by member
/// number and credits their deposit balance when containers come back.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct Customer {
    pub id: CustomerId,
    #[serde(rename = "mem_no")]
    pub member_no: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub points: i64,
    #[serde(rename = "deposit_balance_cents", default)]
    pub deposit_balance: Cents,
    #[serde(default)]
    pub status: CustomerStatus,
}

impl Customer {
    pub fn is_active(&self) -> bool {
        self.status == CustomerStatus::Active
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("Guest")
    }

    /// Key member numbers are looked up by.
    pub fn member_key(member_no: &str) -> String {
        member_no.trim().to_lowercase()
    }

    /// Seed rows never reset a balance the kiosk has already credited.
    pub fn keep_balance_of(mut self, stored: Option<&Customer>) -> Self {
        if let Some(stored) = stored {
            self.deposit_balance = stored.deposit_balance;
        }
        self
    }

    pub fn summary(&self) -> CustomerSummary {
        CustomerSummary {
            id: self.id,
            member_no: self.member_no.clone(),
            name: self.display_name().to_string(),
            points: self.points,
            deposit_balance: self.deposit_balance,
        }
    }
}

/// What callers get to see about a member.
#[derive(Debug, Serialize, PartialEq, Clone)]
pub struct CustomerSummary {
    pub id: CustomerId,
    pub member_no: String,
    pub name: String,
    pub points: i64,
    #[serde(rename = "deposit_balance_cents")]
    pub deposit_balance: Cents,
}
