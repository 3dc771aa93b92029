//! Shared types for the landing demo

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Which simulated device screen is currently displayed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenMode {
    #[default]
    Off,
    Feeding,
    Diaper,
}

impl ScreenMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenMode::Off => "off",
            ScreenMode::Feeding => "feeding",
            ScreenMode::Diaper => "diaper",
        }
    }

    pub fn is_on(&self) -> bool {
        *self != ScreenMode::Off
    }
}

/// NFC-style card that can be tagged against the phone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagCard {
    Feeding,
    Diaper,
}

impl TagCard {
    pub const ALL: [TagCard; 2] = [TagCard::Feeding, TagCard::Diaper];

    pub fn as_str(&self) -> &'static str {
        match self {
            TagCard::Feeding => "feeding",
            TagCard::Diaper => "diaper",
        }
    }

    /// Screen the phone switches to once this card's tag commits
    pub fn screen(&self) -> ScreenMode {
        match self {
            TagCard::Feeding => ScreenMode::Feeding,
            TagCard::Diaper => ScreenMode::Diaper,
        }
    }
}

impl std::fmt::Display for TagCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagCard {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "feeding" => Ok(TagCard::Feeding),
            "diaper" => Ok(TagCard::Diaper),
            other => Err(format!("unknown card: {other}")),
        }
    }
}

/// Bottom navigation tab inside the phone mockup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActiveTab {
    #[default]
    Timeline,
    Lecture,
    Growth,
}

impl ActiveTab {
    pub const ALL: [ActiveTab; 3] = [ActiveTab::Timeline, ActiveTab::Lecture, ActiveTab::Growth];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActiveTab::Timeline => "timeline",
            ActiveTab::Lecture => "lecture",
            ActiveTab::Growth => "growth",
        }
    }

    /// Label shown under the tab icon
    pub fn label(&self) -> &'static str {
        match self {
            ActiveTab::Timeline => "기록",
            ActiveTab::Lecture => "강의",
            ActiveTab::Growth => "성장",
        }
    }
}

impl FromStr for ActiveTab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timeline" => Ok(ActiveTab::Timeline),
            "lecture" => Ok(ActiveTab::Lecture),
            "growth" => Ok(ActiveTab::Growth),
            other => Err(format!("unknown tab: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Ai,
}

/// One entry in a chat demo transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    /// Placeholder shown while the simulated assistant is "typing"
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_typing: bool,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: ChatRole::User, text: text.into(), is_typing: false }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self { role: ChatRole::Ai, text: text.into(), is_typing: false }
    }

    pub fn typing() -> Self {
        Self { role: ChatRole::Ai, text: String::new(), is_typing: true }
    }
}

/// Row inserted into the remote subscriber table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionRecord {
    pub email: String,
    /// RFC 3339 timestamp of the attempt
    pub subscribed_at: String,
}

impl SubscriptionRecord {
    pub fn now(email: &str) -> Self {
        Self {
            email: email.to_string(),
            subscribed_at: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

/// Outcome of a subscribe attempt as seen by the form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubscribeResult {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self { success: false, error: Some(message.into()) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_card_screen() {
        assert_eq!(TagCard::Feeding.screen(), ScreenMode::Feeding);
        assert_eq!(TagCard::Diaper.screen(), ScreenMode::Diaper);
    }

    #[test]
    fn test_parse_card_and_tab() {
        assert_eq!("diaper".parse::<TagCard>(), Ok(TagCard::Diaper));
        assert!("bottle".parse::<TagCard>().is_err());
        assert_eq!("growth".parse::<ActiveTab>(), Ok(ActiveTab::Growth));
        assert!("Growth".parse::<ActiveTab>().is_err());
    }

    #[test]
    fn test_subscribe_result_json() {
        let ok = serde_json::to_string(&SubscribeResult::ok()).unwrap();
        assert_eq!(ok, r#"{"success":true}"#);

        let failed = serde_json::to_string(&SubscribeResult::failed("boom")).unwrap();
        assert_eq!(failed, r#"{"success":false,"error":"boom"}"#);
    }

    #[test]
    fn test_record_timestamp_is_rfc3339() {
        let record = SubscriptionRecord::now("a@b.com");
        assert_eq!(record.email, "a@b.com");
        assert!(chrono::DateTime::parse_from_rfc3339(&record.subscribed_at).is_ok());
        assert!(record.subscribed_at.ends_with('Z'));
    }

    #[test]
    fn test_typing_placeholder_serialization() {
        let json = serde_json::to_value(ChatMessage::typing()).unwrap();
        assert_eq!(json["role"], "ai");
        assert_eq!(json["is_typing"], true);

        let json = serde_json::to_value(ChatMessage::user("hi")).unwrap();
        assert!(json.get("is_typing").is_none());
    }
}
