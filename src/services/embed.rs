//! Discord webhook payloads.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::FetchedRecord;

const UPDATE_COLOR: u32 = 0x4CAF50;
const CONNECTED_COLOR: u32 = 0x00FF00;

/// Top-level webhook body.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WebhookPayload {
    pub embeds: Vec<Embed>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Embed {
    pub title: String,
    pub color: u32,
    pub description: String,
    pub fields: Vec<EmbedField>,
    pub timestamp: DateTime<Utc>,
    pub footer: EmbedFooter,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct EmbedFooter {
    pub text: String,
}

impl EmbedField {
    fn new(name: &str, value: impl Into<String>, inline: bool) -> Self {
        Self {
            name: name.to_string(),
            value: value.into(),
            inline,
        }
    }
}

impl WebhookPayload {
    fn single(embed: Embed) -> Self {
        Self {
            embeds: vec![embed],
        }
    }

    /// Announcement for a confirmed item update.
    pub fn item_updated(record: &FetchedRecord, category: &str, now: DateTime<Utc>) -> Self {
        Self::single(Embed {
            title: "🔧 Workshop Mod Updated".to_string(),
            color: UPDATE_COLOR,
            description: format!("**{}** has been updated!", record.title),
            fields: vec![
                EmbedField::new("📂 Category", category, true),
                // Discord renders <t:..:R> as relative time in the reader's locale
                EmbedField::new("🕐 Updated", format!("<t:{}:R>", record.updated_at), true),
                EmbedField::new(
                    "🔗 Workshop Link",
                    format!("[View on Steam Workshop]({})", record.source_url),
                    false,
                ),
            ],
            timestamp: now,
            footer: EmbedFooter {
                text: format!("Workshop Monitor • Mod ID: {}", record.id),
            },
        })
    }

    /// One-time message confirming the webhook works.
    pub fn connectivity_test(
        item_count: usize,
        category_count: usize,
        interval_minutes: f64,
        now: DateTime<Utc>,
    ) -> Self {
        Self::single(Embed {
            title: "✅ Workshop Monitor Connected".to_string(),
            color: CONNECTED_COLOR,
            description:
                "Your Steam Workshop mod monitor is now active and connected to this channel!"
                    .to_string(),
            fields: vec![
                EmbedField::new(
                    "📊 Monitoring Status",
                    format!(
                        "Currently tracking **{item_count}** mods across **{category_count}** categories"
                    ),
                    false,
                ),
                EmbedField::new(
                    "⏰ Check Interval",
                    format!("Checking for updates every **{interval_minutes} minutes**"),
                    true,
                ),
                EmbedField::new(
                    "🔔 Notifications",
                    "You'll be notified when any tracked mod receives an update",
                    true,
                ),
            ],
            timestamp: now,
            footer: EmbedFooter {
                text: "Workshop Monitor • Test Message".to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> FetchedRecord {
        FetchedRecord {
            id: "42".to_string(),
            title: "Foo".to_string(),
            updated_at: 1_700_000_000,
            source_url: "https://steamcommunity.com/sharedfiles/filedetails/?id=42".to_string(),
        }
    }

    #[test]
    fn test_item_updated_payload() {
        let payload = WebhookPayload::item_updated(&record(), "Essential Mods", Utc::now());
        let json = serde_json::to_value(&payload).unwrap();
        let embed = &json["embeds"][0];

        assert_eq!(embed["color"], 0x4CAF50);
        assert_eq!(embed["description"], "**Foo** has been updated!");
        assert_eq!(embed["fields"][0]["value"], "Essential Mods");
        assert_eq!(embed["fields"][1]["value"], "<t:1700000000:R>");
        assert_eq!(
            embed["fields"][2]["value"],
            "[View on Steam Workshop](https://steamcommunity.com/sharedfiles/filedetails/?id=42)"
        );
        assert_eq!(embed["footer"]["text"], "Workshop Monitor • Mod ID: 42");
    }

    #[test]
    fn test_connectivity_payload() {
        let payload = WebhookPayload::connectivity_test(5, 3, 5.0, Utc::now());
        let embed = &payload.embeds[0];
        assert_eq!(embed.color, 0x00FF00);
        assert!(embed.fields[0].value.contains("**5** mods across **3** categories"));
        assert!(embed.fields[1].value.contains("every **5 minutes**"));
    }
}
