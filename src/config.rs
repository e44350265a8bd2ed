use crate::domain::catalog::{DepositPolicy, RewardBand};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Accepted returns per member and item per day before a warning is shown.
pub const DEFAULT_DAILY_RETURN_CAP: u32 = 5;

/// Tunables of the kiosk engine.
#[derive(Debug, Clone, PartialEq)]
pub struct KioskConfig {
    pub reward_band: RewardBand,
    pub deposit_policy: DepositPolicy,
    /// Advisory only: reaching the cap warns, it never rejects.
    pub daily_return_cap: u32,
    /// Share of an item's savings credited when its container comes back.
    pub credit_ratio: Decimal,
}

impl Default for KioskConfig {
    fn default() -> Self {
        Self {
            reward_band: RewardBand::default(),
            deposit_policy: DepositPolicy::default(),
            daily_return_cap: DEFAULT_DAILY_RETURN_CAP,
            credit_ratio: dec!(0.8),
        }
    }
}
