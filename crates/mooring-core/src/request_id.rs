//! Request identifiers carried in the `x-request-id` header.

use std::fmt;
use std::str::FromStr;

use http::HeaderValue;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlates log lines and responses of one request.
///
/// Generated IDs are UUID v7, so they sort by creation time. Incoming IDs
/// are accepted in any UUID version.
///
/// ```
/// use mooring_core::RequestId;
///
/// let id = RequestId::new();
/// let header = id.to_header_value();
/// assert_eq!(RequestId::from_header(&header), Some(id));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Generates a fresh, time-ordered ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Parses a header value, returning `None` for anything but a UUID.
    #[must_use]
    pub fn from_header(value: &HeaderValue) -> Option<Self> {
        value.to_str().ok()?.trim().parse().ok()
    }

    /// Renders the ID as a lowercase hyphenated header value.
    #[must_use]
    pub fn to_header_value(&self) -> HeaderValue {
        let mut buf = Uuid::encode_buffer();
        let text = self.0.hyphenated().encode_lower(&mut buf);
        // 36 ASCII hex digits and hyphens always form a valid header value.
        HeaderValue::from_str(text).unwrap_or_else(|_| HeaderValue::from_static("-"))
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

impl FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_v7_and_ordered() {
        let first = RequestId::new();
        let second = RequestId::new();
        assert_eq!(first.uuid().get_version_num(), 7);
        assert!(first.uuid() < second.uuid());
    }

    #[test]
    fn test_from_header_accepts_any_uuid() {
        let v4 = HeaderValue::from_static(" 67e55044-10b1-426f-9247-bb680e5fe0c8 ");
        let id = RequestId::from_header(&v4).unwrap();
        assert_eq!(id.to_string(), "67e55044-10b1-426f-9247-bb680e5fe0c8");
    }

    #[test]
    fn test_from_header_rejects_garbage() {
        assert!(RequestId::from_header(&HeaderValue::from_static("req-42")).is_none());
        assert!("".parse::<RequestId>().is_err());
    }

    #[test]
    fn test_serializes_as_string() {
        let id: RequestId = "67e55044-10b1-426f-9247-bb680e5fe0c8".parse().unwrap();
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"67e55044-10b1-426f-9247-bb680e5fe0c8\""
        );
    }
}
