//! IPC protocol definitions
//!
//! Newline-delimited JSON exchanged with local clients over a Unix domain
//! socket. The principal is supplied by the (trusted) local caller.

use serde::{Deserialize, Serialize};

use crate::insights::{StorageStats, UsageReport};
use crate::remote::BucketDescriptor;
use crate::vault::Credential;

/// Protocol version for future compatibility
pub const PROTOCOL_VERSION: u32 = 1;

/// Commands sent by clients
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Command {
    /// Validate and store a remote-storage credential
    #[serde(rename_all = "camelCase")]
    Connect {
        principal: String,
        credential: Credential,
    },
    /// Forget a principal's credential
    #[serde(rename_all = "camelCase")]
    Disconnect { principal: String },
    /// Connection state for a principal
    #[serde(rename_all = "camelCase")]
    Status { principal: String },
    /// Detailed usage report
    #[serde(rename_all = "camelCase")]
    GetAnalytics {
        principal: String,
        #[serde(default)]
        force_refresh: bool,
        #[serde(default)]
        include_external: bool,
    },
    /// Dashboard counters
    #[serde(rename_all = "camelCase")]
    GetStats { principal: String },
}

/// Responses sent back to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Response {
    /// Success response
    #[serde(rename_all = "camelCase")]
    Success {
        /// Optional success message
        message: Option<String>,
    },
    /// Error response
    #[serde(rename_all = "camelCase")]
    Error {
        /// Error message
        error: String,
        /// Machine-readable error code
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    /// Connection state, with visible buckets after a connect
    #[serde(rename_all = "camelCase")]
    Connection {
        version: u32,
        connected: bool,
        buckets: Vec<BucketDescriptor>,
    },
    #[serde(rename_all = "camelCase")]
    Analytics { report: UsageReport },
    #[serde(rename_all = "camelCase")]
    Stats { stats: StorageStats },
}

/// Parse a JSON command from bytes
pub fn parse_command(data: &[u8]) -> Result<Command, serde_json::Error> {
    serde_json::from_slice(data)
}

/// Serialize a response to JSON bytes
pub fn serialize_response(response: &Response) -> Result<Vec<u8>, serde_json::Error> {
    let mut json = serde_json::to_vec(response)?;
    json.push(b'\n'); // Add newline delimiter
    Ok(json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_connect_command() {
        let json = r#"{"type":"connect","principal":"alice","credential":{"accessKeyId":"004xxx","secretAccessKey":"K004xxx","region":"us-west-004"}}"#;
        let cmd = parse_command(json.as_bytes()).unwrap();
        match cmd {
            Command::Connect {
                principal,
                credential,
            } => {
                assert_eq!(principal, "alice");
                assert_eq!(credential.access_key_id, "004xxx");
                assert_eq!(credential.secret_access_key, "K004xxx");
            }
            _ => panic!("Expected Connect command"),
        }
    }

    #[test]
    fn test_parse_get_analytics_defaults() {
        let json = r#"{"type":"getAnalytics","principal":"alice"}"#;
        match parse_command(json.as_bytes()).unwrap() {
            Command::GetAnalytics {
                principal,
                force_refresh,
                include_external,
            } => {
                assert_eq!(principal, "alice");
                assert!(!force_refresh);
                assert!(!include_external);
            }
            _ => panic!("Expected GetAnalytics command"),
        }

        let json = r#"{"type":"getAnalytics","principal":"alice","forceRefresh":true,"includeExternal":true}"#;
        match parse_command(json.as_bytes()).unwrap() {
            Command::GetAnalytics {
                force_refresh,
                include_external,
                ..
            } => {
                assert!(force_refresh);
                assert!(include_external);
            }
            _ => panic!("Expected GetAnalytics command"),
        }
    }

    #[test]
    fn test_parse_rejects_missing_principal() {
        let json = r#"{"type":"getStats"}"#;
        assert!(parse_command(json.as_bytes()).is_err());
    }

    #[test]
    fn test_serialize_error_response() {
        let response = Response::Error {
            error: "Local file records unavailable".to_string(),
            code: Some("local_data".to_string()),
        };
        let json = serialize_response(&response).unwrap();
        let json_str = String::from_utf8(json).unwrap();
        assert!(json_str.ends_with('\n'));
        assert!(json_str.contains(r#""type":"error""#));
        assert!(json_str.contains("local_data"));
    }

    #[test]
    fn test_serialize_stats_response() {
        let response = Response::Stats {
            stats: StorageStats {
                files: 3,
                used_bytes: 60,
                partial: true,
                ..StorageStats::default()
            },
        };
        let json = serialize_response(&response).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
        assert_eq!(value["type"], "stats");
        assert_eq!(value["stats"]["usedBytes"], 60);
        assert_eq!(value["stats"]["partial"], true);
    }
}
