/// Persisted total for one calendar day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyTotal {
    pub date_key: String,
    pub count: u64,
}

impl DailyTotal {
    pub fn new(date_key: impl Into<String>, count: u64) -> Self {
        Self {
            date_key: date_key.into(),
            count,
        }
    }
}
