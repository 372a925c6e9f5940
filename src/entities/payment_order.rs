use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The three-state order lifecycle. `Pending` is the only non-terminal state;
/// once an order reaches `Success` or `Failed` it never transitions again.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    utoipa::ToSchema,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Success,
    Failed,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_orders")]
pub struct Model {
    /// Order id; doubles as the vendor-facing merchant transaction id.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub customer_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub service: Option<String>,

    /// Amount in the smallest currency unit (paise). Always round(major * 100).
    pub amount_minor: i64,

    /// Stored as a string; parse with `OrderStatus::from_str`.
    pub status: String,

    /// Vendor-assigned transaction id, set when the vendor confirms an outcome.
    pub transaction_id: Option<String>,
    pub payment_method: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Parses the stored status column. Unknown values map to `Failed` rather
    /// than panicking; they can only appear through out-of-band writes.
    pub fn order_status(&self) -> OrderStatus {
        self.status.parse().unwrap_or(OrderStatus::Failed)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_round_trips_through_strings() {
        assert_eq!(OrderStatus::Pending.to_string(), "pending");
        assert_eq!(OrderStatus::from_str("success").unwrap(), OrderStatus::Success);
        assert_eq!(OrderStatus::from_str("FAILED").unwrap(), OrderStatus::Failed);
    }

    #[test]
    fn terminal_states_are_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Success.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
    }
}
