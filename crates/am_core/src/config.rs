use crate::app_error::{AppError, AppResult};
use serde::{Deserialize, Serialize};

pub const DEFAULT_TIMESTAMP_LEEWAY_SECS: i64 = 120;
pub const DEFAULT_CLOSE_CALL_WINDOW_SECS: i64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeConfig {
    /// A matched duplicate whose timestamps differ by more than this is
    /// reported as a suspected faulty correlation. Clock drift between
    /// machines is usually tens of seconds.
    pub timestamp_leeway_secs: i64,
    /// A novel-key message this close to an existing bucket entry is
    /// reported as a close call.
    pub close_call_window_secs: i64,
    /// Compute everything, commit nothing.
    pub pretend: bool,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            timestamp_leeway_secs: DEFAULT_TIMESTAMP_LEEWAY_SECS,
            close_call_window_secs: DEFAULT_CLOSE_CALL_WINDOW_SECS,
            pretend: false,
        }
    }
}

impl MergeConfig {
    pub fn validate(&self) -> AppResult<()> {
        if self.timestamp_leeway_secs < 0 {
            return Err(AppError::config(
                "timestamp leeway must not be negative",
                serde_json::json!({ "timestamp_leeway_secs": self.timestamp_leeway_secs }),
            ));
        }
        if self.close_call_window_secs < 0 {
            return Err(AppError::config(
                "close call window must not be negative",
                serde_json::json!({ "close_call_window_secs": self.close_call_window_secs }),
            ));
        }
        Ok(())
    }
}
