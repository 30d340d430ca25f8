use anyhow::{Result, bail};
use serde::Deserialize;
use serde_json::json;

use crate::{
    signals::vol_signal::VolKind,
    strategy::{
        context::StrategyContext,
        instrument_context::{InstrumentContext, WithContext},
        position_state::PositionState,
        strategy::Strategy,
        strategy_helpers::StrategyHelpers,
    },
    types::{
        instrument::InstrumentId,
        trade_action::{ActionKind, TradeAction},
    },
};

const STRUCTURE: &str = "LONG_STRADDLE";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct LongStraddleParams {
    /// Minimum VOL_UP strength to open.
    pub entry_threshold: f64,
    /// Maximum VOL_DOWN strength to close.
    pub exit_threshold: f64,
    pub lot_size: u32,
}

impl Default for LongStraddleParams {
    fn default() -> Self {
        Self {
            entry_threshold: 0.6,
            exit_threshold: 0.3,
            lot_size: 1,
        }
    }
}

impl LongStraddleParams {
    pub fn validate(&self) -> Result<()> {
        validate_thresholds(self.entry_threshold, self.exit_threshold, self.lot_size)
    }
}

pub(crate) fn validate_thresholds(entry: f64, exit: f64, lot_size: u32) -> Result<()> {
    if !(0.0..=1.0).contains(&entry) || !(0.0..=1.0).contains(&exit) {
        bail!("entry/exit thresholds must lie in [0, 1] (entry={entry}, exit={exit})");
    }
    if lot_size == 0 {
        bail!("lot_size must be positive");
    }
    Ok(())
}

/// High volatility long straddle:
/// - VOL_UP with strength >= entry while FLAT buys a call and a put at the money
/// - VOL_DOWN with strength <= exit while POSITIONED sells both legs back
///
/// Legs are issued on the underlying itself; the option contract is resolved
/// downstream from the `leg` and `approx_strike` metadata.
#[derive(Debug, Clone)]
pub struct LongStraddleStrategy {
    ctx: InstrumentContext,
    params: LongStraddleParams,
    state: PositionState,
    last_strike: Option<f64>,
}

impl LongStraddleStrategy {
    pub fn new(underlying: InstrumentId, params: LongStraddleParams) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            ctx: InstrumentContext::new(underlying, params.lot_size),
            params,
            state: PositionState::Flat,
            last_strike: None,
        })
    }

    pub fn last_strike(&self) -> Option<f64> {
        self.last_strike
    }

    fn straddle_legs(&self, kind: ActionKind, strike: f64) -> Vec<TradeAction> {
        ["CALL", "PUT"]
            .into_iter()
            .map(|leg| {
                self.leg(
                    kind,
                    &[
                        ("structure", json!(STRUCTURE)),
                        ("leg", json!(leg)),
                        ("approx_strike", json!(strike)),
                    ],
                )
            })
            .collect()
    }
}

impl WithContext for LongStraddleStrategy {
    fn ctx(&self) -> &InstrumentContext {
        &self.ctx
    }
}

impl Strategy for LongStraddleStrategy {
    fn name(&self) -> &'static str {
        "long_straddle"
    }

    fn on_tick(&mut self, _ctx: &StrategyContext<'_>) -> Vec<TradeAction> {
        Vec::new()
    }

    fn on_vol_signal(&mut self, ctx: &StrategyContext<'_>) -> Vec<TradeAction> {
        let Some(signal) = self.relevant_signal(ctx) else {
            return Vec::new();
        };
        let Some(price) = self.underlying_price(ctx) else {
            return Vec::new();
        };

        match (self.state, signal.kind) {
            (PositionState::Flat, VolKind::Up)
                if signal.strength >= self.params.entry_threshold =>
            {
                self.state = PositionState::Positioned;
                // At-the-money approximation; rounding to a listed strike happens downstream.
                self.last_strike = Some(price);
                self.straddle_legs(ActionKind::OpenLong, price)
            }
            (PositionState::Positioned, VolKind::Down)
                if signal.strength <= self.params.exit_threshold =>
            {
                self.state = PositionState::Flat;
                let strike = self.last_strike.unwrap_or(price);
                self.straddle_legs(ActionKind::CloseLong, strike)
            }
            _ => Vec::new(),
        }
    }

    fn position_state(&self) -> PositionState {
        self.state
    }
}
