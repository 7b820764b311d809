use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const CATEGORY_CONFIG: &str = "config";
pub const CATEGORY_STORE: &str = "store";
pub const CATEGORY_INTEGRITY: &str = "integrity";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppError {
    pub schema_version: u32,
    pub code: String,
    pub category: String,
    pub message: String,
    pub retryable: bool,
    pub details: Value,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn new(code: &str, category: &str, message: &str, retryable: bool, details: Value) -> Self {
        Self {
            schema_version: 1,
            code: code.to_string(),
            category: category.to_string(),
            message: message.to_string(),
            retryable,
            details,
        }
    }

    pub fn internal(message: &str) -> Self {
        Self::new("AM_INTERNAL_ERROR", "internal", message, false, json!({}))
    }

    /// Rejected before any store is opened.
    pub fn config(message: &str, details: Value) -> Self {
        Self::new("AM_CONFIG_INVALID", CATEGORY_CONFIG, message, false, details)
    }

    /// Store invariant violation. A run that hits one of these must not commit.
    pub fn integrity(code: &str, message: &str, details: Value) -> Self {
        Self::new(code, CATEGORY_INTEGRITY, message, false, details)
    }

    pub fn store(code: &str, message: &str, details: Value) -> Self {
        Self::new(code, CATEGORY_STORE, message, false, details)
    }

    pub fn is_integrity(&self) -> bool {
        self.category == CATEGORY_INTEGRITY
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for AppError {}
