use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// OwnedCard — one row of the remote collection
// ---------------------------------------------------------------------------

/// How many copies of a card one user owns.
///
/// At most one record exists per `(email, card_id)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnedCard {
    #[serde(rename = "$id")]
    pub id: String,
    pub email: String,
    pub card_id: String,
    pub amount_owned: u32,
}

// ---------------------------------------------------------------------------
// NewOwnedCard — field map sent on create, before the store assigns an id
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOwnedCard {
    pub email: String,
    pub card_id: String,
    pub amount_owned: u32,
}

impl NewOwnedCard {
    pub fn into_owned(self, id: impl Into<String>) -> OwnedCard {
        OwnedCard {
            id: id.into(),
            email: self.email,
            card_id: self.card_id,
            amount_owned: self.amount_owned,
        }
    }
}
