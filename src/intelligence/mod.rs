pub mod chain_flow;
pub mod exchange_flow;
pub mod flow_classifier;
pub mod hive_mind;
pub mod macro_bias;
pub mod sentiment;
pub mod signals;
pub mod taxonomy;
pub mod whale_detector;

pub use chain_flow::{analyze_chain, total_stable_inflow};
pub use exchange_flow::{analyze_exchange, smart_money_flow};
pub use flow_classifier::{classify_flows, screen_pairs, WashTradeFilter};
pub use hive_mind::{debate, run_debates};
pub use macro_bias::{macro_outlook, MacroOutlook, Regime};
pub use sentiment::{composite_sentiment, SentimentInputs, SentimentLabel, SentimentScore};
pub use signals::{chain_opportunities, exchange_opportunities, rank_opportunities, SignalThresholds};
pub use taxonomy::{Taxonomy, TaxonomyError};
pub use whale_detector::{detect_accumulation, WhaleGates};
