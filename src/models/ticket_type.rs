use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TicketType {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub kind: TicketKind,
    pub price: Decimal,
    /// `None` means unlimited; the ledger never rejects a reservation.
    pub capacity: Option<i32>,
    /// Mutated only through the capacity ledger's atomic primitive.
    pub sold_count: i32,
    /// When set, a sold-out reservation lands on the waitlist instead of
    /// failing with a capacity error.
    pub waitlist_enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl TicketType {
    /// Remaining capacity, clamped at zero. `None` means unlimited.
    pub fn remaining(&self) -> Option<i32> {
        self.capacity.map(|cap| (cap - self.sold_count).max(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum TicketKind {
    Free,
    Paid,
    Donation,
}
