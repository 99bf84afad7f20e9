pub mod paper_trader;
pub mod position_sizer;
pub mod treasury;
pub mod weight_adapter;

pub use paper_trader::{run_paper_trading, TradingActivity};
pub use position_sizer::{kelly_fraction, size_position, SizingDecision, WinStats};
pub use treasury::{TreasuryState, TreasurySummary};
pub use weight_adapter::{adapt_weights, AdaptOutcome, WeightChange};
