use std::collections::HashMap;
use std::fmt;

use anyhow::{Context, Result};
use futures_util::StreamExt;
use tracing::{debug, info};

use crate::{
    engine::signal_dispatch::SignalDispatch,
    events::Tick,
    execution::{
        DynBroker,
        action_sink::{DynActionSink, LogActionSink},
    },
    market::{
        candle_aggregator::CandleAggregator, event_loop::EventLoop,
        market_source::DynMarketFeed, market_state::MarketState,
    },
    risk::engine::DynRiskFilter,
    signals::DynVolatilityModel,
    strategy::{context::StrategyContext, strategy::DynStrategy},
    types::{instrument::InstrumentId, trade_action::TradeAction},
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EngineSummary {
    pub ticks: u64,
    pub actions_published: u64,
}

/// Drives one tick at a time through
/// event loop -> positions -> vol models -> strategies -> risk filter -> sink.
///
/// Models and strategies are called in registration order; that order is also
/// the order of signals and actions within a tick.
pub struct Engine {
    feed: DynMarketFeed,
    broker: DynBroker,
    vol_models: Vec<DynVolatilityModel>,
    strategies: Vec<DynStrategy>,
    risk_filter: DynRiskFilter,
    sink: DynActionSink,
    event_loop: EventLoop,
    aggregator: Option<CandleAggregator>,
    dispatch: SignalDispatch,
}

impl Engine {
    pub fn new(
        feed: DynMarketFeed,
        broker: DynBroker,
        vol_models: Vec<DynVolatilityModel>,
        strategies: Vec<DynStrategy>,
        risk_filter: DynRiskFilter,
    ) -> Self {
        Self {
            feed,
            broker,
            vol_models,
            strategies,
            risk_filter,
            sink: Box::new(LogActionSink),
            event_loop: EventLoop::new(),
            aggregator: None,
            dispatch: SignalDispatch::default(),
        }
    }

    pub fn with_sink(mut self, sink: DynActionSink) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_signal_dispatch(mut self, dispatch: SignalDispatch) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Buckets incoming ticks into candles and pushes every closed one into
    /// the market state.
    pub fn with_candle_aggregator(mut self, aggregator: CandleAggregator) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn with_event_loop(mut self, event_loop: EventLoop) -> Self {
        self.event_loop = event_loop;
        self
    }

    pub fn state(&self) -> &MarketState {
        self.event_loop.state()
    }

    pub fn strategies(&self) -> &[DynStrategy] {
        &self.strategies
    }

    /// One full pipeline pass. Returns the actions that survived the risk
    /// filter, after they were handed to the sink.
    pub async fn process_tick(&mut self, tick: Tick) -> Result<Vec<TradeAction>> {
        let timestamp = tick.timestamp;

        let closed_candle = self
            .aggregator
            .as_mut()
            .and_then(|aggregator| aggregator.on_tick(&tick));
        self.event_loop.apply_tick(tick);
        if let Some(candle) = closed_candle {
            debug!(instrument = %candle.instrument, close = %candle.close, "Candle closed");
            self.event_loop.push_candle(candle);
        }

        let positions = self
            .broker
            .positions()
            .await
            .context("failed to fetch broker positions")?;
        let mut net: HashMap<InstrumentId, i64> = HashMap::new();
        for position in positions {
            *net.entry(position.instrument).or_default() += position.quantity;
        }
        let state = self.event_loop.apply_positions(net);

        let mut signals = Vec::new();
        for model in &mut self.vol_models {
            if let Some(signal) = model.update(state) {
                debug!(
                    model = model.name(),
                    instrument = %signal.instrument,
                    kind = %signal.kind,
                    strength = signal.strength,
                    "Vol signal"
                );
                signals.push(signal);
            }
        }

        let ctx = StrategyContext::new(state, &signals);
        let vol_calls = self.dispatch.calls_for(signals.len());

        let mut actions = Vec::new();
        for strategy in &mut self.strategies {
            actions.extend(strategy.on_tick(&ctx));
            for _ in 0..vol_calls {
                actions.extend(strategy.on_vol_signal(&ctx));
            }
        }

        let candidates = actions.len();
        let approved = self.risk_filter.filter_actions(actions);
        if candidates > 0 {
            debug!(candidates, approved = approved.len(), "Risk filter applied");
        }

        self.sink
            .publish(timestamp, &approved)
            .await
            .context("failed to publish actions")?;

        Ok(approved)
    }

    /// Consumes the feed until it ends. Feed, broker and sink failures abort
    /// the run.
    pub async fn run(&mut self) -> Result<EngineSummary> {
        let mut ticks = self.feed.stream()?;
        info!(
            vol_models = self.vol_models.len(),
            strategies = self.strategies.len(),
            dispatch = %self.dispatch,
            "Engine started"
        );

        let mut summary = EngineSummary::default();
        while let Some(tick) = ticks.next().await {
            let tick = tick.context("market feed failed")?;
            let published = self.process_tick(tick).await?;

            summary.ticks += 1;
            summary.actions_published += published.len() as u64;
        }

        info!(
            ticks = summary.ticks,
            actions = summary.actions_published,
            "Engine stopped, feed exhausted"
        );
        Ok(summary)
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("vol_models", &self.vol_models.len())
            .field("strategies", &self.strategies.len())
            .field("dispatch", &self.dispatch)
            .field("aggregating", &self.aggregator.is_some())
            .field("state", self.event_loop.state())
            .finish()
    }
}
