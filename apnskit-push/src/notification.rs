//! Notification payloads and APNs request headers.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::{ApnsError, Result};

/// `apns-topic` header: the app bundle ID.
pub const APNS_TOPIC: &str = "apns-topic";
/// `apns-push-type` header.
pub const APNS_PUSH_TYPE: &str = "apns-push-type";
/// `apns-priority` header.
pub const APNS_PRIORITY: &str = "apns-priority";
/// `apns-expiration` header.
pub const APNS_EXPIRATION: &str = "apns-expiration";
/// `apns-id` header (delivery identifier).
pub const APNS_ID: &str = "apns-id";
/// `apns-collapse-id` header.
pub const APNS_COLLAPSE_ID: &str = "apns-collapse-id";

const APS: &str = "aps";

/// APNs request headers.
///
/// Names are stored lower-cased; inserting an existing name replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    /// Create an empty header set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a header, replacing any previous value.
    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) -> Option<String> {
        self.0.insert(name.as_ref().to_ascii_lowercase(), value.into())
    }

    /// Get a header value.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    /// Remove a header.
    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.0.remove(&name.to_ascii_lowercase())
    }

    /// Check if a header is present.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of headers.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no headers.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

/// Value of the `apns-expiration` header (Unix timestamp, seconds).
///
/// [`Expiration::NONE`] suppresses the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Expiration(pub i64);

impl Expiration {
    /// No expiration header.
    pub const NONE: Expiration = Expiration(-1);

    /// Parse a decimal timestamp.
    pub fn parse(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i64>()
            .map(Expiration)
            .map_err(|e| ApnsError::InvalidParameter(format!("invalid expiration {:?}: {}", s, e)))
    }

    /// Whether this is the "no value" sentinel.
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for Expiration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Value of the `apns-priority` header.
///
/// [`Priority::NONE`] suppresses the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// No priority header.
    pub const NONE: Priority = Priority(-1);
    /// Deliver immediately.
    pub const IMMEDIATE: Priority = Priority(10);
    /// Deliver with power considerations; required for background pushes.
    pub const POWER_SAVING: Priority = Priority(5);

    /// Parse a decimal priority.
    pub fn parse(s: &str) -> Result<Self> {
        s.trim()
            .parse::<i32>()
            .map(Priority)
            .map_err(|e| ApnsError::InvalidParameter(format!("invalid priority {:?}: {}", s, e)))
    }

    /// Whether this is the "no value" sentinel.
    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Push type derived from the `aps` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushType {
    /// Visible alert, badge or sound.
    Alert,
    /// Silent content-available push.
    Background,
}

impl PushType {
    /// Header value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alert => "alert",
            Self::Background => "background",
        }
    }
}

impl fmt::Display for PushType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accumulates a notification payload and derives its headers.
///
/// Keys serialize in the order they were first set. Setting a key again
/// replaces its value in place.
#[derive(Debug, Clone)]
pub struct NotificationBuilder {
    app_id: String,
    content: Map<String, Value>,
    expiration: Expiration,
    priority: Priority,
    collapse_id: Option<String>,
    apns_id: Option<String>,
}

impl NotificationBuilder {
    /// Create a builder for the app with bundle ID `app_id`.
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            content: Map::new(),
            expiration: Expiration::NONE,
            priority: Priority::NONE,
            collapse_id: None,
            apns_id: None,
        }
    }

    /// The app bundle ID used for `apns-topic`.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    /// Set `aps.<key>`, replacing an `aps` value that is not an object.
    fn set_aps(&mut self, key: &str, value: Value) -> &mut Self {
        match self.content.entry(APS).or_insert_with(|| Value::Object(Map::new())) {
            Value::Object(aps) => {
                aps.insert(key.to_string(), value);
            }
            other => {
                let mut aps = Map::new();
                aps.insert(key.to_string(), value);
                *other = Value::Object(aps);
            }
        }
        self
    }

    fn aps_ref(&self) -> Option<&Map<String, Value>> {
        match self.content.get(APS) {
            Some(Value::Object(aps)) => Some(aps),
            _ => None,
        }
    }

    /// Set `aps.alert`.
    pub fn set_alert_text(&mut self, text: impl Into<String>) -> &mut Self {
        self.set_aps("alert", Value::String(text.into()))
    }

    /// Set `aps.badge`.
    pub fn set_badge_count(&mut self, count: u32) -> &mut Self {
        self.set_aps("badge", Value::from(count))
    }

    /// Set `aps.sound`.
    pub fn set_sound_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.set_aps("sound", Value::String(name.into()))
    }

    /// Set `aps.content-available` to 1 or 0.
    pub fn set_content_available(&mut self, value: bool) -> &mut Self {
        self.set_aps("content-available", Value::from(u8::from(value)))
    }

    /// Shallow-merge top-level keys into the payload, overwriting existing keys.
    pub fn merge(&mut self, data: Map<String, Value>) -> &mut Self {
        for (key, value) in data {
            self.content.insert(key, value);
        }
        self
    }

    /// Serialize `data` and merge it as top-level keys.
    ///
    /// Fails with [`ApnsError::Serialization`] if `data` does not serialize
    /// to a JSON object.
    pub fn try_merge<T: Serialize + ?Sized>(&mut self, data: &T) -> Result<&mut Self> {
        match serde_json::to_value(data)? {
            Value::Object(map) => Ok(self.merge(map)),
            other => Err(ApnsError::Serialization(format!(
                "custom payload data must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Set the `apns-expiration` header. [`Expiration::NONE`] removes it.
    pub fn set_expiration(&mut self, expiration: Expiration) -> &mut Self {
        self.expiration = expiration;
        self
    }

    /// Set the `apns-priority` header. [`Priority::NONE`] removes it.
    pub fn set_priority(&mut self, priority: Priority) -> &mut Self {
        self.priority = priority;
        self
    }

    /// Set the `apns-collapse-id` header.
    pub fn set_collapse_id(&mut self, collapse_id: impl Into<String>) -> &mut Self {
        self.collapse_id = Some(collapse_id.into());
        self
    }

    /// Set a caller-chosen `apns-id` request header.
    pub fn set_apns_id(&mut self, apns_id: impl Into<String>) -> &mut Self {
        self.apns_id = Some(apns_id.into());
        self
    }

    /// Set a random UUID as the `apns-id` request header.
    pub fn generate_apns_id(&mut self) -> &mut Self {
        self.set_apns_id(uuid::Uuid::new_v4().to_string())
    }

    /// Derive the push type from the current `aps` contents.
    ///
    /// Any of `alert`, `badge` or `sound` makes an alert push; otherwise
    /// `content-available == 1` makes a background push.
    pub fn push_type(&self) -> Option<PushType> {
        let aps = self.aps_ref()?;
        if ["alert", "badge", "sound"].iter().any(|k| aps.contains_key(*k)) {
            Some(PushType::Alert)
        } else if aps.get("content-available").and_then(Value::as_u64) == Some(1) {
            Some(PushType::Background)
        } else {
            None
        }
    }

    /// Build the request headers.
    pub fn build_headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert(APNS_TOPIC, self.app_id.clone());

        match self.push_type() {
            Some(PushType::Background) => {
                headers.insert(APNS_PUSH_TYPE, PushType::Background.as_str());
                headers.insert(APNS_PRIORITY, Priority::POWER_SAVING.to_string());
            }
            Some(push_type) => {
                headers.insert(APNS_PUSH_TYPE, push_type.as_str());
            }
            None => {}
        }

        if !self.priority.is_none() {
            headers.insert(APNS_PRIORITY, self.priority.to_string());
        }
        if !self.expiration.is_none() {
            headers.insert(APNS_EXPIRATION, self.expiration.to_string());
        }
        if let Some(collapse_id) = &self.collapse_id {
            headers.insert(APNS_COLLAPSE_ID, collapse_id.clone());
        }
        if let Some(apns_id) = &self.apns_id {
            headers.insert(APNS_ID, apns_id.clone());
        }

        headers
    }

    /// Serialize the payload to JSON.
    pub fn build_content(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(&self.content)?)
    }

    /// Build headers and JSON body.
    pub fn build(&self) -> Result<(Headers, Vec<u8>)> {
        let headers = self.build_headers();
        let content = self.build_content()?;
        Ok((headers, content))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A visible alert notification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlertNotification {
    /// Alert text.
    pub alert_text: Option<String>,
    /// Badge count.
    pub badge: Option<u32>,
    /// Sound name.
    pub sound: Option<String>,
    /// `apns-expiration` header.
    pub expiration: Option<Expiration>,
    /// `apns-priority` header.
    pub priority: Option<Priority>,
}

impl AlertNotification {
    /// Create an alert with the given text.
    pub fn new(text: impl Into<String>) -> Self {
        Self::default().alert_text(text)
    }

    /// Set the alert text.
    pub fn alert_text(mut self, text: impl Into<String>) -> Self {
        self.alert_text = Some(text.into());
        self
    }

    /// Set the badge count.
    pub fn badge(mut self, count: u32) -> Self {
        self.badge = Some(count);
        self
    }

    /// Set the sound name.
    pub fn sound(mut self, name: impl Into<String>) -> Self {
        self.sound = Some(name.into());
        self
    }

    /// Set the expiration.
    pub fn expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Set the priority.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    fn builder(&self, app_id: &str) -> NotificationBuilder {
        let mut builder = NotificationBuilder::new(app_id);
        if let Some(text) = non_empty(&self.alert_text) {
            builder.set_alert_text(text);
        }
        if let Some(badge) = self.badge {
            builder.set_badge_count(badge);
        }
        if let Some(sound) = non_empty(&self.sound) {
            builder.set_sound_name(sound);
        }
        if let Some(expiration) = self.expiration {
            builder.set_expiration(expiration);
        }
        if let Some(priority) = self.priority {
            builder.set_priority(priority);
        }
        builder
    }
}

/// A silent background notification with optional custom data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackgroundNotification {
    /// Custom top-level keys merged into the payload.
    pub data: Map<String, Value>,
}

impl BackgroundNotification {
    /// Create a background notification without custom data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse custom data from a JSON object string.
    pub fn from_json_str(data: &str) -> Result<Self> {
        let data: Map<String, Value> = serde_json::from_str(data)
            .map_err(|e| ApnsError::InvalidParameter(format!("invalid notification data: {}", e)))?;
        Ok(Self { data })
    }

    /// Add a custom top-level key.
    pub fn data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    fn builder(&self, app_id: &str) -> NotificationBuilder {
        let mut builder = NotificationBuilder::new(app_id);
        builder.set_content_available(true).merge(self.data.clone());
        builder
    }
}

/// A caller-assembled notification sent verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawNotification {
    /// Request body, sent as-is.
    pub body: Vec<u8>,
    /// `apns-priority` header value, sent as-is when non-empty.
    pub priority: Option<String>,
    /// `apns-push-type` header value, sent as-is when non-empty.
    pub push_type: Option<String>,
}

impl RawNotification {
    /// Create a raw notification with the given body.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: body.into(),
            priority: None,
            push_type: None,
        }
    }

    /// Set the priority header value.
    pub fn priority(mut self, priority: impl Into<String>) -> Self {
        self.priority = Some(priority.into());
        self
    }

    /// Set the push-type header value.
    pub fn push_type(mut self, push_type: impl Into<String>) -> Self {
        self.push_type = Some(push_type.into());
        self
    }
}

/// The notification kinds a send operation can deliver.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// Visible alert.
    Alert(AlertNotification),
    /// Silent background push.
    Background(BackgroundNotification),
    /// Verbatim body and headers.
    Raw(RawNotification),
}

impl Notification {
    /// Build the request headers and body for `app_id`.
    pub fn build(&self, app_id: &str) -> Result<(Headers, Vec<u8>)> {
        match self {
            Self::Alert(alert) => alert.builder(app_id).build(),
            Self::Background(background) => background.builder(app_id).build(),
            Self::Raw(raw) => {
                let mut headers = Headers::new();
                headers.insert(APNS_TOPIC, app_id);
                if let Some(priority) = non_empty(&raw.priority) {
                    headers.insert(APNS_PRIORITY, priority);
                }
                if let Some(push_type) = non_empty(&raw.push_type) {
                    headers.insert(APNS_PUSH_TYPE, push_type);
                }
                Ok((headers, raw.body.clone()))
            }
        }
    }

    /// Short name of the notification kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Alert(_) => "alert",
            Self::Background(_) => "background",
            Self::Raw(_) => "raw",
        }
    }
}

impl From<AlertNotification> for Notification {
    fn from(n: AlertNotification) -> Self {
        Self::Alert(n)
    }
}

impl From<BackgroundNotification> for Notification {
    fn from(n: BackgroundNotification) -> Self {
        Self::Background(n)
    }
}

impl From<RawNotification> for Notification {
    fn from(n: RawNotification) -> Self {
        Self::Raw(n)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body_json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    #[test]
    fn test_alert_text_round_trip() {
        let mut builder = NotificationBuilder::new("com.example.app");
        builder.set_alert_text("hi");
        let (headers, body) = builder.build().unwrap();

        assert_eq!(body, br#"{"aps":{"alert":"hi"}}"#.to_vec());
        assert_eq!(headers.get(APNS_PUSH_TYPE), Some("alert"));
        assert_eq!(headers.get(APNS_TOPIC), Some("com.example.app"));
        assert_eq!(headers.len(), 2);
    }

    #[test]
    fn test_insertion_order_is_preserved() {
        let mut builder = NotificationBuilder::new("app");
        builder
            .set_sound_name("default")
            .set_alert_text("Hello")
            .set_badge_count(3)
            .set_sound_name("chime");

        let body = builder.build_content().unwrap();
        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"{"aps":{"sound":"chime","alert":"Hello","badge":3}}"#
        );
    }

    #[test]
    fn test_alert_takes_precedence_over_background() {
        let mut builder = NotificationBuilder::new("app");
        builder.set_content_available(true).set_alert_text("hi");

        assert_eq!(builder.push_type(), Some(PushType::Alert));
        let headers = builder.build_headers();
        assert_eq!(headers.get(APNS_PUSH_TYPE), Some("alert"));
        assert_eq!(headers.get(APNS_PRIORITY), None);
    }

    #[test]
    fn test_badge_or_sound_alone_is_alert() {
        let mut badge = NotificationBuilder::new("app");
        badge.set_badge_count(0);
        assert_eq!(badge.push_type(), Some(PushType::Alert));

        let mut sound = NotificationBuilder::new("app");
        sound.set_sound_name("default");
        assert_eq!(sound.push_type(), Some(PushType::Alert));
    }

    #[test]
    fn test_background_forces_priority_five() {
        let mut builder = NotificationBuilder::new("app");
        builder.set_content_available(true);

        let headers = builder.build_headers();
        assert_eq!(headers.get(APNS_PUSH_TYPE), Some("background"));
        assert_eq!(headers.get(APNS_PRIORITY), Some("5"));
    }

    #[test]
    fn test_explicit_priority_overrides_background_default() {
        let mut builder = NotificationBuilder::new("app");
        builder.set_content_available(true).set_priority(Priority(10));
        assert_eq!(builder.build_headers().get(APNS_PRIORITY), Some("10"));

        builder.set_priority(Priority::NONE);
        assert_eq!(builder.build_headers().get(APNS_PRIORITY), Some("5"));
    }

    #[test]
    fn test_content_available_zero_has_no_push_type() {
        let mut builder = NotificationBuilder::new("app");
        builder.set_content_available(false);

        assert_eq!(builder.push_type(), None);
        let headers = builder.build_headers();
        assert!(!headers.contains(APNS_PUSH_TYPE));
        assert_eq!(body_json(&builder.build_content().unwrap()), json!({"aps": {"content-available": 0}}));
    }

    #[test]
    fn test_empty_builder() {
        let builder = NotificationBuilder::new("app");
        let (headers, body) = builder.build().unwrap();
        assert_eq!(body, b"{}".to_vec());
        assert_eq!(headers.len(), 1);
        assert_eq!(builder.push_type(), None);
    }

    #[test]
    fn test_merge_overwrites_existing_keys() {
        let mut builder = NotificationBuilder::new("app");
        builder.set_content_available(true);

        let mut data = Map::new();
        data.insert("id".into(), json!(1));
        data.insert("kind".into(), json!("sync"));
        builder.merge(data);

        let mut data = Map::new();
        data.insert("id".into(), json!(2));
        builder.merge(data);

        assert_eq!(
            body_json(&builder.build_content().unwrap()),
            json!({"aps": {"content-available": 1}, "id": 2, "kind": "sync"})
        );
    }

    #[test]
    fn test_merge_can_replace_aps() {
        let mut builder = NotificationBuilder::new("app");
        builder.set_alert_text("hi");
        let mut data = Map::new();
        data.insert("aps".into(), json!("oops"));
        builder.merge(data);

        assert_eq!(builder.push_type(), None);
        builder.set_badge_count(1);
        assert_eq!(body_json(&builder.build_content().unwrap()), json!({"aps": {"badge": 1}}));
    }

    #[test]
    fn test_non_object_aps_is_replaced_in_place() {
        let mut builder = NotificationBuilder::new("app");
        let mut data = Map::new();
        data.insert("thread".into(), json!("t-1"));
        data.insert("aps".into(), json!(5));
        builder.merge(data).set_sound_name("chime").set_badge_count(2);

        assert_eq!(
            builder.build_content().unwrap(),
            br#"{"thread":"t-1","aps":{"sound":"chime","badge":2}}"#.to_vec()
        );
    }

    #[test]
    fn test_try_merge_rejects_non_objects() {
        let mut builder = NotificationBuilder::new("app");
        let err = builder.try_merge(&vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, ApnsError::Serialization(_)));

        #[derive(Serialize)]
        struct Custom {
            thread: &'static str,
        }
        builder.try_merge(&Custom { thread: "t1" }).unwrap();
        assert_eq!(body_json(&builder.build_content().unwrap()), json!({"thread": "t1"}));
    }

    #[test]
    fn test_expiration_and_priority_headers() {
        let mut builder = NotificationBuilder::new("app");
        builder
            .set_alert_text("hi")
            .set_expiration(Expiration(1700000000))
            .set_priority(Priority::IMMEDIATE);

        let headers = builder.build_headers();
        assert_eq!(headers.get(APNS_EXPIRATION), Some("1700000000"));
        assert_eq!(headers.get(APNS_PRIORITY), Some("10"));

        builder.set_expiration(Expiration::NONE);
        assert!(!builder.build_headers().contains(APNS_EXPIRATION));
    }

    #[test]
    fn test_collapse_and_apns_id_headers() {
        let mut builder = NotificationBuilder::new("app");
        builder.set_collapse_id("score").set_apns_id("123e4567-e89b");
        let headers = builder.build_headers();
        assert_eq!(headers.get(APNS_COLLAPSE_ID), Some("score"));
        assert_eq!(headers.get(APNS_ID), Some("123e4567-e89b"));

        builder.generate_apns_id();
        let generated = builder.build_headers().get(APNS_ID).unwrap().to_string();
        assert!(uuid::Uuid::parse_str(&generated).is_ok());
    }

    #[test]
    fn test_parse_expiration_and_priority() {
        assert_eq!(Expiration::parse("3600").unwrap(), Expiration(3600));
        assert_eq!(Priority::parse(" 5 ").unwrap(), Priority(5));
        assert!(matches!(Priority::parse("high"), Err(ApnsError::InvalidParameter(_))));
        assert!(matches!(Expiration::parse(""), Err(ApnsError::InvalidParameter(_))));
        assert!(Expiration::parse("-1").unwrap().is_none());
    }

    #[test]
    fn test_headers_are_case_insensitive() {
        let mut headers = Headers::new();
        headers.insert("APNS-Topic", "a");
        headers.insert("apns-topic", "b");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Apns-Topic"), Some("b"));
        assert_eq!(headers.iter().next(), Some(("apns-topic", "b")));
    }

    #[test]
    fn test_alert_notification_kind() {
        let notification = Notification::from(AlertNotification::new("Hello").badge(3).sound("default"));
        let (headers, body) = notification.build("com.example.app").unwrap();

        assert_eq!(
            String::from_utf8(body).unwrap(),
            r#"{"aps":{"alert":"Hello","badge":3,"sound":"default"}}"#
        );
        assert_eq!(headers.get(APNS_PUSH_TYPE), Some("alert"));
        assert_eq!(notification.kind(), "alert");
    }

    #[test]
    fn test_alert_notification_skips_empty_strings() {
        let notification = Notification::Alert(AlertNotification {
            alert_text: Some(String::new()),
            sound: Some(String::new()),
            ..Default::default()
        });
        let (headers, body) = notification.build("app").unwrap();
        assert_eq!(body, b"{}".to_vec());
        assert!(!headers.contains(APNS_PUSH_TYPE));
    }

    #[test]
    fn test_background_notification_kind() {
        let notification =
            Notification::from(BackgroundNotification::from_json_str(r#"{"sync":true}"#).unwrap());
        let (headers, body) = notification.build("app").unwrap();

        assert_eq!(body_json(&body), json!({"aps": {"content-available": 1}, "sync": true}));
        assert_eq!(headers.get(APNS_PUSH_TYPE), Some("background"));
        assert_eq!(headers.get(APNS_PRIORITY), Some("5"));
    }

    #[test]
    fn test_background_data_must_be_object() {
        assert!(matches!(
            BackgroundNotification::from_json_str("[1]"),
            Err(ApnsError::InvalidParameter(_))
        ));
        assert!(BackgroundNotification::from_json_str("{").is_err());
    }

    #[test]
    fn test_raw_notification_kind() {
        let notification = Notification::from(
            RawNotification::new(r#"{"aps":{"alert":"raw"}}"#)
                .priority("10")
                .push_type("alert"),
        );
        let (headers, body) = notification.build("app").unwrap();

        assert_eq!(body, br#"{"aps":{"alert":"raw"}}"#.to_vec());
        assert_eq!(headers.get(APNS_TOPIC), Some("app"));
        assert_eq!(headers.get(APNS_PRIORITY), Some("10"));
        assert_eq!(headers.get(APNS_PUSH_TYPE), Some("alert"));

        let bare = Notification::from(RawNotification::new("{}").priority(""));
        let (headers, _) = bare.build("app").unwrap();
        assert_eq!(headers.len(), 1);
    }
}
