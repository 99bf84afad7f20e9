use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Direction, ReasonTag};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PositionStatus {
    Open,
    ClosedTp,
    ClosedSl,
}

impl PositionStatus {
    pub fn is_open(&self) -> bool {
        matches!(self, PositionStatus::Open)
    }
}

/// A simulated position. Lives in the paper positions document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperPosition {
    pub id: Uuid,
    pub symbol: String,
    /// Chain the opportunity came from.
    pub source_asset: String,
    pub direction: Direction,
    pub entry_price: Decimal,
    pub entry_time: DateTime<Utc>,
    pub size_usd: Decimal,
    pub current_price: Decimal,
    pub status: PositionStatus,
    pub pnl_pct: Decimal,
    pub pnl_usd: Decimal,
    pub exit_price: Option<Decimal>,
    pub exit_time: Option<DateTime<Utc>>,
    pub score: Decimal,
    pub tags: Vec<ReasonTag>,
}

impl PaperPosition {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    pub fn is_win(&self) -> bool {
        !self.is_open() && self.pnl_pct > Decimal::ZERO
    }
}
