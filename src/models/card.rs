use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Card — catalog entry, owned by the catalog service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub card_id: String,
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}
