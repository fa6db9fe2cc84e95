use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::strip_code_fence;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum BorderColor {
    Black,
    White,
    Silver,
    Gold,
    Borderless,
}

impl BorderColor {
    pub(crate) const ALL: [BorderColor; 5] = [
        BorderColor::Black,
        BorderColor::White,
        BorderColor::Silver,
        BorderColor::Gold,
        BorderColor::Borderless,
    ];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            BorderColor::Black => "Black",
            BorderColor::White => "White",
            BorderColor::Silver => "Silver",
            BorderColor::Gold => "Gold",
            BorderColor::Borderless => "Borderless",
        }
    }
}

impl fmt::Display for BorderColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) enum Rarity {
    Common,
    Uncommon,
    Rare,
    #[serde(rename = "Mythic Rare")]
    MythicRare,
}

impl Rarity {
    pub(crate) const ALL: [Rarity; 4] = [
        Rarity::Common,
        Rarity::Uncommon,
        Rarity::Rare,
        Rarity::MythicRare,
    ];

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Uncommon => "Uncommon",
            Rarity::Rare => "Rare",
            Rarity::MythicRare => "Mythic Rare",
        }
    }
}

impl fmt::Display for Rarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The printed attributes of one identified card.
///
/// Every value of this type has passed schema validation: deserialization goes
/// through [`RawCardRecord`] and rejects missing required fields, unknown enum
/// members and an empty card name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawCardRecord")]
pub(crate) struct CardRecord {
    pub(crate) card_name: String,
    pub(crate) set_code: String,
    pub(crate) border_color: BorderColor,
    pub(crate) artist: String,
    pub(crate) rarity: Rarity,
    #[serde(rename = "type")]
    pub(crate) type_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) mana_cost: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) power_toughness: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCardRecord {
    card_name: String,
    set_code: String,
    border_color: BorderColor,
    artist: String,
    rarity: Rarity,
    #[serde(rename = "type")]
    type_line: String,
    mana_cost: Option<String>,
    power_toughness: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum CardError {
    #[error("model output is not JSON: {0}")]
    NotJson(serde_json::Error),

    #[error("model output does not match the card schema: {0}")]
    Schema(serde_json::Error),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),
}

impl CardError {
    /// Schema mismatches are worth another attempt; unparsable text is not.
    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, CardError::Schema(_))
    }
}

impl TryFrom<RawCardRecord> for CardRecord {
    type Error = CardError;

    fn try_from(raw: RawCardRecord) -> Result<Self, Self::Error> {
        if raw.card_name.trim().is_empty() {
            return Err(CardError::EmptyField("cardName"));
        }
        Ok(CardRecord {
            card_name: raw.card_name,
            set_code: raw.set_code,
            border_color: raw.border_color,
            artist: raw.artist,
            rarity: raw.rarity,
            type_line: raw.type_line,
            mana_cost: non_blank(raw.mana_cost),
            power_toughness: non_blank(raw.power_toughness),
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl CardRecord {
    /// Parse raw model text into a validated record.
    pub(crate) fn from_model_text(text: &str) -> Result<CardRecord, CardError> {
        let value: serde_json::Value =
            serde_json::from_str(strip_code_fence(text)).map_err(CardError::NotJson)?;
        serde_json::from_value(value).map_err(CardError::Schema)
    }

    pub(crate) fn to_label_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

/// Output schema handed to the model, in the OpenAPI subset the service accepts.
pub(crate) fn card_response_schema() -> serde_json::Value {
    let border_colors: Vec<&str> = BorderColor::ALL.iter().map(|b| b.as_str()).collect();
    let rarities: Vec<&str> = Rarity::ALL.iter().map(|r| r.as_str()).collect();
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "cardName": {"type": "STRING", "description": "Name printed at the top left of the card"},
            "setCode": {"type": "STRING", "description": "Three-letter expansion code"},
            "borderColor": {"type": "STRING", "enum": border_colors},
            "artist": {"type": "STRING", "description": "Artist credit printed at the bottom"},
            "rarity": {"type": "STRING", "enum": rarities},
            "type": {"type": "STRING", "description": "Full type line, e.g. Creature - Goblin"},
            "manaCost": {"type": "STRING", "description": "Mana cost in {X}{R} notation"},
            "powerToughness": {"type": "STRING", "description": "Power/toughness such as 2/2"}
        },
        "required": ["cardName", "setCode", "borderColor", "artist", "rarity", "type"],
        "propertyOrdering": [
            "cardName", "setCode", "borderColor", "artist", "rarity", "type", "manaCost", "powerToughness"
        ]
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub(crate) enum Identification {
    Identified { card: CardRecord },
    NotIdentified { reason: String },
}

impl Identification {
    pub(crate) fn card(&self) -> Option<&CardRecord> {
        match self {
            Identification::Identified { card } => Some(card),
            Identification::NotIdentified { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct IdentificationResult {
    pub(crate) file_name: String,
    #[serde(flatten)]
    pub(crate) outcome: Identification,
}

impl IdentificationResult {
    pub(crate) fn identified(file_name: String, card: CardRecord) -> Self {
        IdentificationResult {
            file_name,
            outcome: Identification::Identified { card },
        }
    }

    pub(crate) fn not_identified(file_name: String, reason: impl Into<String>) -> Self {
        IdentificationResult {
            file_name,
            outcome: Identification::NotIdentified {
                reason: reason.into(),
            },
        }
    }
}

#[cfg(test)]
pub(crate) fn sample_card(name: &str) -> CardRecord {
    CardRecord {
        card_name: name.to_string(),
        set_code: "M10".to_string(),
        border_color: BorderColor::Black,
        artist: "Kev Walker".to_string(),
        rarity: Rarity::Common,
        type_line: "Creature - Goblin".to_string(),
        mana_cost: Some("{R}".to_string()),
        power_toughness: Some("1/1".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIGHTNING_BOLT: &str = r#"{
        "cardName": "Lightning Bolt",
        "setCode": "LEA",
        "borderColor": "Black",
        "artist": "Christopher Rush",
        "rarity": "Common",
        "type": "Instant",
        "manaCost": "{R}"
    }"#;

    #[test]
    fn parses_complete_record() {
        let card = CardRecord::from_model_text(LIGHTNING_BOLT).unwrap();
        assert_eq!(card.card_name, "Lightning Bolt");
        assert_eq!(card.set_code, "LEA");
        assert_eq!(card.border_color, BorderColor::Black);
        assert_eq!(card.rarity, Rarity::Common);
        assert_eq!(card.type_line, "Instant");
        assert_eq!(card.mana_cost.as_deref(), Some("{R}"));
        assert_eq!(card.power_toughness, None);
    }

    #[test]
    fn mythic_rare_uses_spaced_name() {
        let text = r#"{"cardName":"Jace, the Mind Sculptor","setCode":"WWK","borderColor":"Black",
            "artist":"Jason Chan","rarity":"Mythic Rare","type":"Legendary Planeswalker - Jace"}"#;
        let card = CardRecord::from_model_text(text).unwrap();
        assert_eq!(card.rarity, Rarity::MythicRare);
        assert!(card.to_label_json().contains("\"Mythic Rare\""));
    }

    #[test]
    fn missing_required_field_is_schema_error() {
        let text = r#"{"cardName":"Shock","setCode":"M19","borderColor":"Black","rarity":"Common","type":"Instant"}"#;
        let err = CardRecord::from_model_text(text).unwrap_err();
        assert!(matches!(err, CardError::Schema(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn unknown_enum_member_is_schema_error() {
        let text = r#"{"cardName":"Shock","setCode":"M19","borderColor":"Purple","artist":"Jon Foster",
            "rarity":"Common","type":"Instant"}"#;
        assert!(matches!(
            CardRecord::from_model_text(text),
            Err(CardError::Schema(_))
        ));

        let text = r#"{"cardName":"Shock","setCode":"M19","borderColor":"Black","artist":"Jon Foster",
            "rarity":"Legendary","type":"Instant"}"#;
        assert!(matches!(
            CardRecord::from_model_text(text),
            Err(CardError::Schema(_))
        ));
    }

    #[test]
    fn blank_card_name_is_rejected() {
        let text = r#"{"cardName":"  ","setCode":"M19","borderColor":"Black","artist":"Jon Foster",
            "rarity":"Common","type":"Instant"}"#;
        let err = CardRecord::from_model_text(text).unwrap_err();
        assert!(err.is_retryable());
        assert!(err.to_string().contains("cardName must not be empty"));
    }

    #[test]
    fn non_json_text_is_not_retryable() {
        let err = CardRecord::from_model_text("I think this is a Goblin Guide.").unwrap_err();
        assert!(matches!(err, CardError::NotJson(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn json_that_is_not_an_object_is_schema_error() {
        let err = CardRecord::from_model_text("[1, 2, 3]").unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn null_and_blank_optionals_are_absent() {
        let text = r#"{"cardName":"Forest","setCode":"ZEN","borderColor":"Black","artist":"John Avon",
            "rarity":"Common","type":"Basic Land - Forest","manaCost":null,"powerToughness":""}"#;
        let card = CardRecord::from_model_text(text).unwrap();
        assert_eq!(card.mana_cost, None);
        assert_eq!(card.power_toughness, None);
        let json = card.to_label_json();
        assert!(!json.contains("manaCost"));
        assert!(!json.contains("powerToughness"));
    }

    #[test]
    fn fenced_output_is_unwrapped() {
        let text = format!("```json\n{LIGHTNING_BOLT}\n```");
        let card = CardRecord::from_model_text(&text).unwrap();
        assert_eq!(card.card_name, "Lightning Bolt");
    }

    #[test]
    fn label_json_reparses_to_same_record() {
        let card = sample_card("Goblin Piker");
        let again = CardRecord::from_model_text(&card.to_label_json()).unwrap();
        assert_eq!(card, again);
    }

    #[test]
    fn schema_lists_every_enum_member() {
        let schema = card_response_schema();
        let borders = schema["properties"]["borderColor"]["enum"].as_array().unwrap();
        assert_eq!(borders.len(), BorderColor::ALL.len());
        let rarities = schema["properties"]["rarity"]["enum"].as_array().unwrap();
        assert!(rarities.iter().any(|r| r == "Mythic Rare"));
        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 6);
        assert!(!required.iter().any(|r| r == "manaCost"));
    }

    #[test]
    fn result_serializes_with_status_tag() {
        let ok = IdentificationResult::identified("bolt.jpg".to_string(), sample_card("Bolt"));
        let value = serde_json::to_value(&ok).unwrap();
        assert_eq!(value["status"], "identified");
        assert_eq!(value["file_name"], "bolt.jpg");
        assert_eq!(value["card"]["cardName"], "Bolt");

        let failed = IdentificationResult::not_identified("blurry.png".to_string(), "retries exhausted");
        let value = serde_json::to_value(&failed).unwrap();
        assert_eq!(value["status"], "not_identified");
        assert_eq!(value["reason"], "retries exhausted");
        assert!(failed.outcome.card().is_none());
    }
}
