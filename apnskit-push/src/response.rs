//! APNs response wrapper.

use serde::Deserialize;

use crate::notification::{Headers, APNS_ID};

/// Status code APNs returns for an accepted notification.
pub const STATUS_OK: u16 = 200;

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    reason: String,
}

/// The raw outcome of one HTTP exchange with APNs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResult {
    status: u16,
    headers: Headers,
    body: Vec<u8>,
}

impl SendResult {
    /// Create a result from its parts.
    pub fn new(status: u16, headers: Headers, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub(crate) async fn from_reqwest(response: reqwest::Response) -> crate::Result<Self> {
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        Ok(Self {
            status,
            headers,
            body,
        })
    }

    /// HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Response headers.
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Response body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Whether APNs accepted the notification. Only 200 counts.
    pub fn success(&self) -> bool {
        self.status == STATUS_OK
    }

    /// The `apns-id` response header, or empty if absent.
    pub fn id(&self) -> &str {
        self.header(APNS_ID).unwrap_or_default()
    }

    /// The `reason` field of a JSON error body.
    ///
    /// Empty when the body is empty, not JSON, or has no `reason`.
    pub fn error_reason(&self) -> String {
        serde_json::from_slice::<ErrorBody>(&self.body)
            .map(|b| b.reason)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> Headers {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_success_is_exactly_200() {
        assert!(SendResult::new(200, Headers::new(), Vec::new()).success());
        assert!(!SendResult::new(201, Headers::new(), Vec::new()).success());
        assert!(!SendResult::new(410, Headers::new(), Vec::new()).success());
    }

    #[test]
    fn test_id_reads_apns_id_header() {
        let result = SendResult::new(200, headers(&[("Apns-Id", "123e4567-e89b")]), Vec::new());
        assert_eq!(result.id(), "123e4567-e89b");
        assert_eq!(SendResult::new(200, Headers::new(), Vec::new()).id(), "");
    }

    #[test]
    fn test_error_reason() {
        let result = SendResult::new(400, Headers::new(), br#"{"reason":"BadDeviceToken"}"#.to_vec());
        assert_eq!(result.error_reason(), "BadDeviceToken");

        let gone = SendResult::new(
            410,
            Headers::new(),
            br#"{"reason":"Unregistered","timestamp":1700000000000}"#.to_vec(),
        );
        assert_eq!(gone.error_reason(), "Unregistered");
    }

    #[test]
    fn test_error_reason_tolerates_bad_bodies() {
        for body in [&b""[..], b"<html>", b"{}", b"[]", br#"{"reason":1}"#] {
            let result = SendResult::new(500, Headers::new(), body.to_vec());
            assert_eq!(result.error_reason(), "", "body {:?}", String::from_utf8_lossy(body));
        }
    }
}
