use crate::error::ChatError;

/// An unordered user pair reduced to its canonical form: `low` sorts
/// strictly before `high`. The canonical form is the uniqueness key for
/// channels, so `normalize(a, b)` and `normalize(b, a)` must always agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalPair {
    low: String,
    high: String,
}

impl CanonicalPair {
    /// Order two distinct user ids. Pure; no I/O.
    pub fn normalize(a: &str, b: &str) -> Result<Self, ChatError> {
        if a.is_empty() || b.is_empty() {
            return Err(ChatError::InvalidInput(
                "user id must not be empty".into(),
            ));
        }
        if a == b {
            return Err(ChatError::InvalidInput(
                "cannot open a conversation with yourself".into(),
            ));
        }

        let (low, high) = if a < b { (a, b) } else { (b, a) };
        Ok(Self {
            low: low.to_string(),
            high: high.to_string(),
        })
    }

    pub fn low(&self) -> &str {
        &self.low
    }

    pub fn high(&self) -> &str {
        &self.high
    }

    /// True when `user_id` is one of the two participants.
    pub fn contains(&self, user_id: &str) -> bool {
        self.low == user_id || self.high == user_id
    }
}
