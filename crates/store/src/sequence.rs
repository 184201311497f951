//! Process-wide monotonic counters.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::Result;

/// Name of the counter that feeds SSCC serial references.
pub const SSCC_SERIAL_REFERENCE: &str = "sscc_serial_reference";

/// A named counter that never hands out the same value twice.
///
/// Values are strictly increasing per name. Gaps are allowed (a value taken
/// by a transaction that later fails is not reused).
#[async_trait]
pub trait SequenceCounter: Send + Sync {
    /// Returns the next value of the counter called `name`.
    async fn next_value(&self, name: &str) -> Result<i64>;
}

/// In-memory counter.
#[derive(Clone)]
pub struct InMemorySequenceCounter {
    seed: i64,
    values: Arc<Mutex<HashMap<String, i64>>>,
}

impl InMemorySequenceCounter {
    /// Creates a counter whose first value for every name is `seed`.
    pub fn new(seed: i64) -> Self {
        Self {
            seed,
            values: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

impl Default for InMemorySequenceCounter {
    fn default() -> Self {
        Self::new(1)
    }
}

#[async_trait]
impl SequenceCounter for InMemorySequenceCounter {
    async fn next_value(&self, name: &str) -> Result<i64> {
        let mut values = self.values.lock().await;
        let value = values
            .entry(name.to_string())
            .and_modify(|v| *v += 1)
            .or_insert(self.seed);
        Ok(*value)
    }
}
