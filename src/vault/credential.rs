//! Remote storage credential

use std::fmt;

use serde::{Deserialize, Serialize};

/// Access credential for a remote object store
///
/// Immutable once stored; a reconnect replaces it wholesale.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Access key ID (B2 application key ID)
    pub access_key_id: String,
    /// Secret access key (B2 application key)
    pub secret_access_key: String,
    /// Storage region, informational for B2
    #[serde(default)]
    pub region: String,
    /// Optional short-lived session token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl Credential {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            region: region.into(),
            session_token: None,
        }
    }

    pub fn with_session_token(mut self, token: impl Into<String>) -> Self {
        self.session_token = Some(token.into());
        self
    }

    /// Both the key ID and the secret are present
    pub fn is_well_formed(&self) -> bool {
        !self.access_key_id.trim().is_empty() && !self.secret_access_key.trim().is_empty()
    }
}

// Secrets never reach log output
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("region", &self.region)
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_secrets() {
        let cred = Credential::new("004abc", "K004secret", "us-west-004").with_session_token("sess-token-123");
        let rendered = format!("{:?}", cred);
        assert!(rendered.contains("004abc"));
        assert!(!rendered.contains("K004secret"));
        assert!(!rendered.contains("sess-token-123"));
    }

    #[test]
    fn test_well_formed() {
        assert!(Credential::new("id", "secret", "").is_well_formed());
        assert!(!Credential::new("", "secret", "").is_well_formed());
        assert!(!Credential::new("id", "  ", "").is_well_formed());
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{"accessKeyId":"004xxx","secretAccessKey":"K004xxx","region":"eu-central-003"}"#;
        let cred: Credential = serde_json::from_str(json).unwrap();
        assert_eq!(cred.access_key_id, "004xxx");
        assert_eq!(cred.secret_access_key, "K004xxx");
        assert_eq!(cred.region, "eu-central-003");
        assert_eq!(cred.session_token, None);
    }
}
