use anyhow::{Result, bail};
use serde::Deserialize;
use serde_json::json;

use crate::{
    signals::vol_signal::VolKind,
    strategy::{
        context::StrategyContext,
        instrument_context::{InstrumentContext, WithContext},
        position_state::PositionState,
        strategies::long_straddle::validate_thresholds,
        strategy::Strategy,
        strategy_helpers::StrategyHelpers,
    },
    types::{
        instrument::InstrumentId,
        trade_action::{ActionKind, TradeAction},
    },
};

const STRUCTURE: &str = "IRON_CONDOR";

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ShortCondorParams {
    /// Distance from the center to the short strikes; wings sit at twice this.
    pub width: f64,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
    pub lot_size: u32,
}

impl Default for ShortCondorParams {
    fn default() -> Self {
        Self {
            width: 100.0,
            entry_threshold: 0.6,
            exit_threshold: 0.3,
            lot_size: 1,
        }
    }
}

impl ShortCondorParams {
    pub fn validate(&self) -> Result<()> {
        if !self.width.is_finite() || self.width <= 0.0 {
            bail!("condor width must be finite and positive, got {}", self.width);
        }
        validate_thresholds(self.entry_threshold, self.exit_threshold, self.lot_size)
    }
}

#[derive(Debug, Clone, Copy)]
struct CondorLeg {
    name: &'static str,
    open: ActionKind,
    close: ActionKind,
    width_multiple: f64,
}

const LEGS: [CondorLeg; 4] = [
    CondorLeg {
        name: "SHORT_CALL",
        open: ActionKind::OpenShort,
        close: ActionKind::CloseShort,
        width_multiple: 1.0,
    },
    CondorLeg {
        name: "SHORT_PUT",
        open: ActionKind::OpenShort,
        close: ActionKind::CloseShort,
        width_multiple: -1.0,
    },
    CondorLeg {
        name: "LONG_CALL",
        open: ActionKind::OpenLong,
        close: ActionKind::CloseLong,
        width_multiple: 2.0,
    },
    CondorLeg {
        name: "LONG_PUT",
        open: ActionKind::OpenLong,
        close: ActionKind::CloseLong,
        width_multiple: -2.0,
    },
];

/// Low volatility short iron condor. Enters on a strong VOL_DOWN signal and
/// exits when a VOL_UP signal arrives with strength at or below the exit
/// threshold.
#[derive(Debug, Clone)]
pub struct ShortCondorStrategy {
    ctx: InstrumentContext,
    params: ShortCondorParams,
    state: PositionState,
    center_strike: Option<f64>,
}

impl ShortCondorStrategy {
    pub fn new(underlying: InstrumentId, params: ShortCondorParams) -> Result<Self> {
        params.validate()?;

        Ok(Self {
            ctx: InstrumentContext::new(underlying, params.lot_size),
            params,
            state: PositionState::Flat,
            center_strike: None,
        })
    }

    pub fn center_strike(&self) -> Option<f64> {
        self.center_strike
    }

    fn open_legs(&self, center: f64) -> Vec<TradeAction> {
        LEGS.iter()
            .map(|leg| {
                let relative = leg.width_multiple * self.params.width;
                self.leg(
                    leg.open,
                    &[
                        ("structure", json!(STRUCTURE)),
                        ("leg", json!(leg.name)),
                        ("relative_strike", json!(relative)),
                        ("center_strike", json!(center)),
                        ("strike", json!(center + relative)),
                    ],
                )
            })
            .collect()
    }

    fn close_legs(&self) -> Vec<TradeAction> {
        LEGS.iter()
            .map(|leg| {
                self.leg(
                    leg.close,
                    &[("structure", json!(STRUCTURE)), ("leg", json!(leg.name))],
                )
            })
            .collect()
    }
}

impl WithContext for ShortCondorStrategy {
    fn ctx(&self) -> &InstrumentContext {
        &self.ctx
    }
}

impl Strategy for ShortCondorStrategy {
    fn name(&self) -> &'static str {
        "short_condor"
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
            (PositionState::Flat, VolKind::Down)
                if signal.strength >= self.params.entry_threshold =>
            {
                self.state = PositionState::Positioned;
                self.center_strike = Some(price);
                self.open_legs(price)
            }
            (PositionState::Positioned, VolKind::Up)
                if signal.strength <= self.params.exit_threshold =>
            {
                self.state = PositionState::Flat;
                self.close_legs()
            }
            _ => Vec::new(),
        }
    }

    fn position_state(&self) -> PositionState {
        self.state
    }
}
