use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use super::{DocumentStore, StoreError, Versioned};
use crate::execution::TreasuryState;
use crate::models::{AgentWeights, PaperPosition};

pub const AGENT_WEIGHTS: &str = "agent_weights";
pub const TREASURY: &str = "treasury";
pub const PAPER_POSITIONS: &str = "paper_positions";

/// Everything the trading side persists between cycles.
#[derive(Debug, Clone)]
pub struct TradingState {
    pub weights: Versioned<AgentWeights>,
    pub treasury: Versioned<TreasuryState>,
    pub positions: Versioned<Vec<PaperPosition>>,
}

pub async fn load_agent_weights(store: &DocumentStore) -> Result<Versioned<AgentWeights>, StoreError> {
    let mut doc: Versioned<AgentWeights> = store.load(AGENT_WEIGHTS).await?;
    doc.data = doc.data.normalized();
    Ok(doc)
}

pub async fn load_treasury(
    store: &DocumentStore,
    initial_capital: Decimal,
) -> Result<Versioned<TreasuryState>, StoreError> {
    store
        .load_or(TREASURY, || TreasuryState::new(initial_capital))
        .await
}

pub async fn load_positions(store: &DocumentStore) -> Result<Versioned<Vec<PaperPosition>>, StoreError> {
    store.load(PAPER_POSITIONS).await
}

pub async fn load_trading_state(
    store: &DocumentStore,
    initial_capital: Decimal,
) -> Result<TradingState, StoreError> {
    Ok(TradingState {
        weights: load_agent_weights(store).await?,
        treasury: load_treasury(store, initial_capital).await?,
        positions: load_positions(store).await?,
    })
}

/// Save all three documents. Each save is attempted even if an earlier one
/// failed; the first error is returned.
pub async fn save_trading_state(
    store: &DocumentStore,
    state: &mut TradingState,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let results = [
        store.save(AGENT_WEIGHTS, &mut state.weights, now).await,
        store.save(TREASURY, &mut state.treasury, now).await,
        store.save(PAPER_POSITIONS, &mut state.positions, now).await,
    ];

    let mut first_err = None;
    for (name, result) in [AGENT_WEIGHTS, TREASURY, PAPER_POSITIONS].iter().zip(results) {
        if let Err(e) = result {
            tracing::error!(document = name, error = %e, "Failed to save document");
            first_err.get_or_insert(e);
        }
    }

    match first_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
