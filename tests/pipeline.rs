use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use futures_util::{StreamExt, stream};

use volpipe::engine::engine::Engine;
use volpipe::events::{Candle, Tick};
use volpipe::execution::Broker;
use volpipe::execution::action_sink::ActionSink;
use volpipe::execution::simulated::SimulatedBroker;
use volpipe::execution::types::{ExecutionReport, OrderModification, OrderRequest, Position};
use volpipe::feeds::replay::ReplayFeed;
use volpipe::market::market_source::{MarketFeed, TickStream};
use volpipe::market::market_state::MarketState;
use volpipe::risk::engine::RiskFilter;
use volpipe::signals::VolatilityModel;
use volpipe::signals::models::realized::{RealizedVolModel, RealizedVolParams};
use volpipe::signals::vol_signal::{VolKind, VolSignal};
use volpipe::strategy::context::StrategyContext;
use volpipe::strategy::position_state::PositionState;
use volpipe::strategy::strategies::long_straddle::{LongStraddleParams, LongStraddleStrategy};
use volpipe::strategy::strategies::short_condor::{ShortCondorParams, ShortCondorStrategy};
use volpipe::strategy::strategy::Strategy;
use volpipe::types::instrument::InstrumentId;
use volpipe::types::price::Price;
use volpipe::types::trade_action::{ActionKind, TradeAction};

const UNDERLYING: InstrumentId = InstrumentId::new(256265);

fn ts(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + seconds, 0).unwrap()
}

struct SingleTickFeed {
    tick: Option<Tick>,
}

#[async_trait]
impl MarketFeed for SingleTickFeed {
    async fn subscribe(&mut self, _instruments: &[InstrumentId]) -> Result<()> {
        Ok(())
    }

    fn stream(&mut self) -> Result<TickStream> {
        let tick = self.tick.take().ok_or_else(|| anyhow!("already streamed"))?;
        Ok(stream::iter([Ok(tick)]).boxed())
    }
}

struct CountingBroker {
    position_calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Broker for CountingBroker {
    async fn place_order(&self, _order: OrderRequest) -> Result<ExecutionReport> {
        Err(anyhow!("orders are not placed by the pipeline"))
    }

    async fn modify_order(
        &self,
        _order_id: &str,
        _modification: OrderModification,
    ) -> Result<ExecutionReport> {
        Err(anyhow!("orders are not placed by the pipeline"))
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<()> {
        Ok(())
    }

    async fn positions(&self) -> Result<Vec<Position>> {
        self.position_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Vec::new())
    }
}

struct FixedUpModel {
    update_calls: Arc<AtomicUsize>,
}

impl VolatilityModel for FixedUpModel {
    fn name(&self) -> &'static str {
        "fixed_up"
    }

    fn instrument(&self) -> InstrumentId {
        UNDERLYING
    }

    fn update(&mut self, _state: &MarketState) -> Option<VolSignal> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        Some(VolSignal::new(UNDERLYING, VolKind::Up, 0.9, ts(0)))
    }
}

struct OpenLongStrategy {
    vol_calls: Arc<AtomicUsize>,
}

impl Strategy for OpenLongStrategy {
    fn name(&self) -> &'static str {
        "open_long"
    }

    fn on_tick(&mut self, _ctx: &StrategyContext<'_>) -> Vec<TradeAction> {
        Vec::new()
    }

    fn on_vol_signal(&mut self, _ctx: &StrategyContext<'_>) -> Vec<TradeAction> {
        self.vol_calls.fetch_add(1, Ordering::SeqCst);
        vec![TradeAction::new(ActionKind::OpenLong, UNDERLYING, 1)]
    }

    fn position_state(&self) -> PositionState {
        PositionState::Flat
    }
}

type Batches = Arc<Mutex<Vec<Vec<TradeAction>>>>;

struct RecordingFilter {
    seen: Batches,
}

impl RiskFilter for RecordingFilter {
    fn filter_actions(&mut self, actions: Vec<TradeAction>) -> Vec<TradeAction> {
        self.seen.lock().unwrap().push(actions.clone());
        actions
    }
}

struct RecordingSink {
    published: Batches,
}

#[async_trait]
impl ActionSink for RecordingSink {
    async fn publish(&mut self, _timestamp: DateTime<Utc>, actions: &[TradeAction]) -> Result<()> {
        if !actions.is_empty() {
            self.published.lock().unwrap().push(actions.to_vec());
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_single_tick_runs_every_stage_once() {
    let position_calls = Arc::new(AtomicUsize::new(0));
    let update_calls = Arc::new(AtomicUsize::new(0));
    let vol_calls = Arc::new(AtomicUsize::new(0));
    let seen: Batches = Arc::default();

    let tick = Tick::new(UNDERLYING, ts(0), Price::new(100.0), 10);
    let mut engine = Engine::new(
        Box::new(SingleTickFeed { tick: Some(tick) }),
        Arc::new(CountingBroker {
            position_calls: position_calls.clone(),
        }),
        vec![Box::new(FixedUpModel {
            update_calls: update_calls.clone(),
        })],
        vec![Box::new(OpenLongStrategy {
            vol_calls: vol_calls.clone(),
        })],
        Box::new(RecordingFilter { seen: seen.clone() }),
    );

    let summary = engine.run().await.unwrap();

    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.actions_published, 1);
    assert_eq!(position_calls.load(Ordering::SeqCst), 1);
    assert_eq!(update_calls.load(Ordering::SeqCst), 1);
    assert!(vol_calls.load(Ordering::SeqCst) >= 1);

    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].len(), 1);
    assert_eq!(seen[0][0].kind, ActionKind::OpenLong);
}

fn flat_candle(seconds: i64, price: f64) -> Candle {
    let price = Price::new(price);
    Candle {
        instrument: UNDERLYING,
        timestamp: ts(seconds),
        open: price,
        high: price,
        low: price,
        close: price,
        volume: 500,
        open_interest: None,
    }
}

#[tokio::test]
async fn test_replay_through_real_models_and_strategies() {
    // 100 x4 ticks, then 105 x12 ticks.
    let candles = vec![
        flat_candle(0, 100.0),
        flat_candle(60, 105.0),
        flat_candle(120, 105.0),
        flat_candle(180, 105.0),
    ];
    let mut feed = ReplayFeed::new(candles);
    feed.subscribe(&[UNDERLYING]).await.unwrap();

    let model = RealizedVolModel::new(
        UNDERLYING,
        RealizedVolParams {
            lookback: 3,
            ..Default::default()
        },
    )
    .unwrap();
    let straddle = LongStraddleStrategy::new(
        UNDERLYING,
        LongStraddleParams {
            entry_threshold: 0.5,
            exit_threshold: 0.4,
            lot_size: 1,
        },
    )
    .unwrap();
    let condor = ShortCondorStrategy::new(
        UNDERLYING,
        ShortCondorParams {
            entry_threshold: 0.0,
            ..Default::default()
        },
    )
    .unwrap();

    let published: Batches = Arc::default();
    let broker = Arc::new(SimulatedBroker::new());
    let mut engine = Engine::new(
        Box::new(feed),
        broker.clone(),
        vec![Box::new(model)],
        vec![Box::new(straddle), Box::new(condor)],
        Box::new(volpipe::risk::engine::PassThroughRiskFilter),
    )
    .with_sink(Box::new(RecordingSink {
        published: published.clone(),
    }));

    let summary = engine.run().await.unwrap();
    assert_eq!(summary.ticks, 16);
    assert_eq!(summary.actions_published, 8);

    let published = published.lock().unwrap();
    let kinds: Vec<Vec<ActionKind>> = published
        .iter()
        .map(|batch| batch.iter().map(|action| action.kind).collect())
        .collect();
    assert_eq!(
        kinds,
        vec![
            // Flat window: low vol, the condor opens.
            vec![
                ActionKind::OpenShort,
                ActionKind::OpenShort,
                ActionKind::OpenLong,
                ActionKind::OpenLong
            ],
            // The 5% jump enters the window: the straddle opens.
            vec![ActionKind::OpenLong, ActionKind::OpenLong],
            // The jump leaves the window: the straddle closes.
            vec![ActionKind::CloseLong, ActionKind::CloseLong],
        ]
    );

    let states: Vec<PositionState> = engine
        .strategies()
        .iter()
        .map(|strategy| strategy.position_state())
        .collect();
    assert_eq!(states, vec![PositionState::Flat, PositionState::Positioned]);

    assert_eq!(engine.state().last_price(UNDERLYING), Some(Price::new(105.0)));
    assert!(broker.positions().await.unwrap().is_empty());
}
