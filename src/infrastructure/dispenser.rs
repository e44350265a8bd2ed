use crate::domain::dispense::{AttemptResult, DispenseOutcome};
use rand::Rng;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Simulated lane hardware: succeeds with `success_rate`, otherwise jams or
/// reports empty with equal odds.
#[derive(Debug, Clone)]
pub struct RandomDispenser {
    success_rate: f64,
}

impl RandomDispenser {
    pub fn new(success_rate: f64) -> Self {
        Self {
            success_rate: success_rate.clamp(0.0, 1.0),
        }
    }
}

impl Default for RandomDispenser {
    fn default() -> Self {
        Self::new(0.8)
    }
}

impl DispenseOutcome for RandomDispenser {
    fn attempt(&self, _item_id: &str, _attempt_no: u8) -> AttemptResult {
        let mut rng = rand::thread_rng();
        if rng.gen_bool(self.success_rate) {
            AttemptResult::Success
        } else if rng.gen_bool(0.5) {
            AttemptResult::Jam
        } else {
            AttemptResult::Empty
        }
    }
}

/// Replays a fixed sequence of outcomes, then keeps succeeding.
#[derive(Debug, Default)]
pub struct ScriptedDispenser {
    script: Mutex<VecDeque<AttemptResult>>,
}

impl ScriptedDispenser {
    pub fn new(script: impl IntoIterator<Item = AttemptResult>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }
}

impl DispenseOutcome for ScriptedDispenser {
    fn attempt(&self, _item_id: &str, _attempt_no: u8) -> AttemptResult {
        match self.script.lock() {
            Ok(mut script) => script.pop_front().unwrap_or(AttemptResult::Success),
            Err(poisoned) => poisoned
                .into_inner()
                .pop_front()
                .unwrap_or(AttemptResult::Success),
        }
    }
}
