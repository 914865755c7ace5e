//! # apnskit-push
//!
//! Apple Push Notification service (APNs) client.
//!
//! ## Features
//!
//! - **Token auth**: ES256 provider tokens signed from a `.p8` key
//! - **Certificate auth**: TLS client identities decoded from `.p12` archives
//! - **Payload building**: alert, background and raw notifications with
//!   derived `apns-*` headers
//! - **HTTP/2 delivery**: one POST per notification, with an optional
//!   curl-style wire log
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apnskit_push::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//!     let config = SendConfig::new("com.example.app", "device-token")
//!         .sandbox(true)
//!         .token_auth(TokenAuth::new(
//!             CredentialSource::file("AuthKey_ABC123DEFG.p8"),
//!             "ABC123DEFG",
//!             "TEAM123456",
//!         ));
//!
//!     let mut op = SendOperation::alert(
//!         ApnsClient::default(),
//!         config,
//!         AlertNotification::new("Hello!").badge(1),
//!     );
//!
//!     match op.exec().await {
//!         Ok(result) => println!("APNS-ID: {}", result.apns_id),
//!         Err(e) if e.should_remove_device() => println!("stale token: {}", e),
//!         Err(e) => return Err(e.into()),
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Building payloads by hand
//!
//! ```rust
//! use apnskit_push::{NotificationBuilder, APNS_PUSH_TYPE};
//!
//! let mut builder = NotificationBuilder::new("com.example.app");
//! builder.set_alert_text("hi");
//!
//! let (headers, body) = builder.build().unwrap();
//! assert_eq!(body, br#"{"aps":{"alert":"hi"}}"#);
//! assert_eq!(headers.get(APNS_PUSH_TYPE), Some("alert"));
//! ```

mod archive;
pub mod auth;
pub mod client;
pub mod error;
pub mod notification;
pub mod operation;
pub mod response;
pub mod settings;
pub mod token;

pub use auth::{
    load_certificate, load_certificate_from_reader, load_private_key,
    load_private_key_from_reader, ClientCertificate, EcdsaPrivateKey,
};
pub use client::{ApnsClient, ApnsClientConfig, ApnsClientConfigBuilder, Endpoint, Transport};
pub use error::{ApnsError, Result, SendOperationError};
pub use notification::{
    AlertNotification, BackgroundNotification, Expiration, Headers, Notification,
    NotificationBuilder, Priority, PushType, RawNotification, APNS_COLLAPSE_ID, APNS_EXPIRATION,
    APNS_ID, APNS_PRIORITY, APNS_PUSH_TYPE, APNS_TOPIC,
};
pub use operation::{
    AuthMode, CertificateAuth, CredentialSource, SendConfig, SendOperation, SendOperationResult,
    SendState, TokenAuth,
};
pub use response::SendResult;
pub use settings::{ApnsSettings, ConfigValidator, EnvLoader, Validate};
pub use token::{generate_token, generate_token_from_pem, AuthToken, TokenClaims, DEFAULT_TOKEN_LIFETIME};

/// Shorten a device token for logs.
pub(crate) fn redact_device_token(token: &str) -> String {
    let prefix: String = token.chars().take(8).collect();
    if prefix.len() < token.len() {
        format!("{}...", prefix)
    } else {
        prefix
    }
}

/// Prelude for common imports.
///
/// ```
/// use apnskit_push::prelude::*;
/// ```
pub mod prelude {
    pub use crate::client::{ApnsClient, ApnsClientConfig, Endpoint, Transport};
    pub use crate::error::{ApnsError, Result, SendOperationError};
    pub use crate::notification::{
        AlertNotification, BackgroundNotification, Expiration, Notification, NotificationBuilder,
        Priority, RawNotification,
    };
    pub use crate::operation::{
        CertificateAuth, CredentialSource, SendConfig, SendOperation, SendOperationResult,
        TokenAuth,
    };
    pub use crate::settings::ApnsSettings;
}
