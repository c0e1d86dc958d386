//! Response handling.
//!
//! # Responsibilities
//! - Expose status code and body of a completed request
//! - Classify the statuses the protocol cares about (200, 304, 404)
//! - Decode JSON bodies into protocol DTOs

use serde::de::DeserializeOwned;

pub const STATUS_OK: u16 = 200;
pub const STATUS_NOT_MODIFIED: u16 = 304;
pub const STATUS_NOT_FOUND: u16 = 404;

/// A completed HTTP exchange. Transport failures never produce one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    pub fn is_not_modified(&self) -> bool {
        self.status == STATUS_NOT_MODIFIED
    }

    pub fn is_not_found(&self) -> bool {
        self.status == STATUS_NOT_FOUND
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(HttpResponse::new(200, "{}").is_ok());
        assert!(HttpResponse::new(304, "").is_not_modified());
        assert!(HttpResponse::new(404, "").is_not_found());
        assert!(!HttpResponse::new(500, "").is_ok());
    }

    #[test]
    fn test_json_decoding() {
        let response = HttpResponse::new(200, r#"{"a": 1}"#);
        let value: serde_json::Value = response.json().unwrap();
        assert_eq!(value["a"], 1);

        let broken = HttpResponse::new(200, "not json");
        assert!(broken.json::<serde_json::Value>().is_err());
    }
}
