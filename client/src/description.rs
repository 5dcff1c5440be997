//! Proposal metadata carried in the governor description string.
//!
//! The governor only stores an opaque description, so the front-end writes a
//! JSON object with the title, body and sub-items into it.

use crate::error::{EvsdError, Result};
use crate::types::ProposalSubItem;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Metadata serialized into a proposal's description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalMetadata {
    /// Proposal title
    #[serde(default)]
    pub title: String,
    /// Proposal body
    #[serde(default)]
    pub description: String,
    /// Whether sub-items are voted on independently
    #[serde(default)]
    pub is_multilayered: bool,
    /// Sub-items; only meaningful when multilayered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_items: Option<Vec<ProposalSubItem>>,
}

impl ProposalMetadata {
    /// Single-layer proposal metadata
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            is_multilayered: false,
            sub_items: None,
        }
    }

    /// Turn this into a multilayered proposal with the given items
    pub fn with_sub_items(mut self, items: Vec<ProposalSubItem>) -> Self {
        self.is_multilayered = true;
        self.sub_items = Some(items);
        self
    }

    /// Check that the form is complete before it is submitted.
    ///
    /// Title and body are required, and a multilayered proposal needs at
    /// least one sub-item with its own title and body.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(EvsdError::InvalidInput("Proposal title is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(EvsdError::InvalidInput(
                "Proposal description is required".to_string(),
            ));
        }
        if self.is_multilayered {
            let items = self.sub_items.as_deref().unwrap_or_default();
            if items.is_empty() {
                return Err(EvsdError::InvalidInput(
                    "A multilayered proposal needs at least one sub-item".to_string(),
                ));
            }
            if let Some(item) = items
                .iter()
                .find(|i| i.title.trim().is_empty() || i.description.trim().is_empty())
            {
                return Err(EvsdError::InvalidInput(format!(
                    "Sub-item {} needs a title and a description",
                    item.id
                )));
            }
        }
        Ok(())
    }

    /// Encode as a governor description string
    pub fn to_description(&self) -> Result<String> {
        let mut payload = self.clone();
        if !payload.is_multilayered {
            payload.sub_items = None;
        }
        Ok(serde_json::to_string(&payload)?)
    }

    /// Decode a governor description string.
    ///
    /// Descriptions that are not a metadata object (for example proposals
    /// created from a script with plain text) become an untitled proposal
    /// with the raw text as body.
    pub fn from_description(raw: &str) -> Self {
        match serde_json::from_str::<ProposalMetadata>(raw) {
            Ok(mut metadata) => {
                if !metadata.is_multilayered {
                    metadata.sub_items = None;
                }
                metadata
            }
            Err(e) => {
                warn!("Description is not a metadata object ({}), using plain text", e);
                Self::new(String::new(), raw)
            }
        }
    }

    /// Sub-items, empty unless multilayered
    pub fn into_sub_items(self) -> Vec<ProposalSubItem> {
        if self.is_multilayered {
            self.sub_items.unwrap_or_default()
        } else {
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_decode_front_end_payload() {
        let raw = r#"{"title":"Budžet 2025","description":"Usvajanje budžeta","isMultilayered":true,"subItems":[{"id":"1","title":"Plate","description":"","votesFor":0,"votesAgainst":0,"votesAbstain":0,"yourVote":"didntVote","votesForAddress":{}}]}"#;
        let metadata = ProposalMetadata::from_description(raw);

        assert_eq!(metadata.title, "Budžet 2025");
        assert!(metadata.is_multilayered);
        let items = metadata.into_sub_items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Plate");
    }

    #[test]
    fn test_sub_items_dropped_when_not_multilayered() {
        let raw = concat!(
            r#"{"title":"T","description":"D","isMultilayered":false,"#,
            r#""subItems":[{"id":"1","title":"X"}]}"#
        );
        let metadata = ProposalMetadata::from_description(raw);
        assert!(metadata.sub_items.is_none());
        assert!(metadata.into_sub_items().is_empty());
    }

    #[test]
    fn test_plain_text_description() {
        let metadata = ProposalMetadata::from_description("Predlog za izmenu statuta");
        assert_eq!(metadata.title, "");
        assert_eq!(metadata.description, "Predlog za izmenu statuta");
        assert!(!metadata.is_multilayered);
    }

    #[test]
    fn test_encode_omits_sub_items_for_single_layer() {
        let mut metadata = ProposalMetadata::new("T", "D");
        metadata.sub_items = Some(vec![ProposalSubItem::new("1", "X", "")]);

        let encoded = metadata.to_description().unwrap();
        assert!(!encoded.contains("subItems"));
        assert!(encoded.contains("\"isMultilayered\":false"));
    }

    #[test]
    fn test_encode_multilayered() {
        let metadata = ProposalMetadata::new("T", "D")
            .with_sub_items(vec![ProposalSubItem::new("1", "X", "opis")]);
        let decoded = ProposalMetadata::from_description(&metadata.to_description().unwrap());
        assert_eq!(decoded, metadata);
    }

    #[test]
    fn test_validate() {
        assert!(ProposalMetadata::new("Statut", "Izmene").validate().is_ok());
        assert_matches!(
            ProposalMetadata::new("  ", "Izmene").validate(),
            Err(EvsdError::InvalidInput(_))
        );
        assert_matches!(
            ProposalMetadata::new("Statut", "").validate(),
            Err(EvsdError::InvalidInput(_))
        );

        let empty = ProposalMetadata::new("Budžet", "Raspodela").with_sub_items(Vec::new());
        assert_matches!(empty.validate(), Err(EvsdError::InvalidInput(_)));

        let incomplete = ProposalMetadata::new("Budžet", "Raspodela")
            .with_sub_items(vec![ProposalSubItem::new("2", "Oprema", "")]);
        assert_matches!(
            incomplete.validate(),
            Err(EvsdError::InvalidInput(msg)) if msg.contains("Sub-item 2")
        );
    }
}
