use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Token category used to bucket DEX volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowCategory {
    Native,
    Stablecoin,
    #[serde(rename = "btc")]
    Btc,
    Altcoin,
}

impl FlowCategory {
    /// Fixed iteration order. Also the tie-break order for the dominant category.
    pub const ALL: [FlowCategory; 4] = [
        FlowCategory::Native,
        FlowCategory::Stablecoin,
        FlowCategory::Btc,
        FlowCategory::Altcoin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FlowCategory::Native => "native",
            FlowCategory::Stablecoin => "stablecoin",
            FlowCategory::Btc => "btc",
            FlowCategory::Altcoin => "altcoin",
        }
    }

    pub(crate) fn index(&self) -> usize {
        match self {
            FlowCategory::Native => 0,
            FlowCategory::Stablecoin => 1,
            FlowCategory::Btc => 2,
            FlowCategory::Altcoin => 3,
        }
    }
}

impl fmt::Display for FlowCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFlowStat {
    pub category: FlowCategory,
    pub volume_usd: Decimal,
    pub volume_pct: Decimal,
    pub liquidity_usd: Decimal,
    pub liquidity_pct: Decimal,
    /// Half a pair per side, so a NATIVE/STABLE pair adds 0.5 to each.
    pub pair_count: Decimal,
    pub net_flow_count: i64,
    pub top_tokens: Vec<String>,
}

impl CategoryFlowStat {
    pub fn empty(category: FlowCategory) -> Self {
        Self {
            category,
            volume_usd: Decimal::ZERO,
            volume_pct: Decimal::ZERO,
            liquidity_usd: Decimal::ZERO,
            liquidity_pct: Decimal::ZERO,
            pair_count: Decimal::ZERO,
            net_flow_count: 0,
            top_tokens: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketBreadth {
    pub advancing: u32,
    pub declining: u32,
    pub unchanged: u32,
    /// advancing / (advancing + declining) × 100, or 50 when nothing moved.
    pub advance_pct: Decimal,
    pub total_buys: u64,
    pub total_sells: u64,
    /// buys / sells. `None` when there were no sells at all.
    pub buy_sell_ratio: Option<Decimal>,
}

/// Where volume is concentrated across the four categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RotationPhase {
    RiskOff,
    NativeLed,
    AltSeason,
    BtcLed,
    Balanced,
    Undetermined,
}

impl RotationPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RotationPhase::RiskOff => "risk_off",
            RotationPhase::NativeLed => "native_led",
            RotationPhase::AltSeason => "alt_season",
            RotationPhase::BtcLed => "btc_led",
            RotationPhase::Balanced => "balanced",
            RotationPhase::Undetermined => "undetermined",
        }
    }
}

impl fmt::Display for RotationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorized flow for one scan target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowBreakdown {
    pub target: String,
    pub total_volume_usd: Decimal,
    pub total_liquidity_usd: Decimal,
    /// Always four entries, in `FlowCategory::ALL` order.
    pub categories: Vec<CategoryFlowStat>,
    pub dominant: Option<FlowCategory>,
    pub pairs_seen: usize,
    pub pairs_below_liquidity: usize,
    pub pairs_wash_traded: usize,
    pub breadth: MarketBreadth,
    pub rotation: RotationPhase,
}

impl FlowBreakdown {
    pub fn stat(&self, category: FlowCategory) -> Option<&CategoryFlowStat> {
        self.categories.iter().find(|s| s.category == category)
    }

    pub fn pairs_used(&self) -> usize {
        self.pairs_seen - self.pairs_below_liquidity - self.pairs_wash_traded
    }
}
