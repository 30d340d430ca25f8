use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::TimeDelta;

use crate::{
    config::Settings,
    engine::engine::Engine,
    execution::{DynBroker, dry_run::DryRunBroker, simulated::SimulatedBroker},
    feeds::{replay::ReplayFeed, synthetic::SyntheticFeed, websocket::WebSocketFeed},
    market::{
        candle_aggregator::CandleAggregator, event_loop::EventLoop, market_source::DynMarketFeed,
    },
    risk::{
        checks::{
            kill_switch::KillSwitchCheck, max_order_quantity::MaxOrderQuantityCheck,
            net_position_limit::NetPositionLimitCheck,
        },
        engine::{DynRiskFilter, PassThroughRiskFilter, RiskCheck, RiskEngine},
    },
    scenario::modes::ModeKind,
    signals::{
        DynVolatilityModel,
        models::{
            atr::AtrVolModel, bollinger::BollingerVolModel, composite::CompositeVolModel,
            ewma::EwmaVolModel, garch::GarchVolModel, realized::RealizedVolModel,
        },
    },
    strategy::{
        strategies::{long_straddle::LongStraddleStrategy, short_condor::ShortCondorStrategy},
        strategy::DynStrategy,
    },
    types::instrument::InstrumentId,
};

/// Concrete broker behind a scenario. Replay runs keep the simulated broker
/// reachable so an outside matching step can fill its orders.
#[derive(Debug, Clone)]
pub enum ScenarioBroker {
    DryRun(Arc<DryRunBroker>),
    Simulated(Arc<SimulatedBroker>),
}

impl ScenarioBroker {
    /// Handle the engine trades through.
    pub fn shared(&self) -> DynBroker {
        match self {
            ScenarioBroker::DryRun(broker) => broker.clone() as DynBroker,
            ScenarioBroker::Simulated(broker) => broker.clone() as DynBroker,
        }
    }

    pub fn simulated(&self) -> Option<&Arc<SimulatedBroker>> {
        match self {
            ScenarioBroker::Simulated(broker) => Some(broker),
            ScenarioBroker::DryRun(_) => None,
        }
    }
}

/// Builds every pipeline component for the configured mode.
pub struct Scenario;

impl Scenario {
    /// Feed for `settings.mode`, already subscribed to the configured
    /// instruments.
    pub async fn feed(settings: &Settings) -> Result<DynMarketFeed> {
        tracing::info!(mode = %settings.mode, "creating market feed");

        let mut feed: DynMarketFeed = match settings.mode {
            ModeKind::Synthetic => {
                Box::new(SyntheticFeed::new(settings.feed.synthetic.clone())?)
            }
            ModeKind::Replay => {
                let path = settings
                    .feed
                    .replay
                    .candles_path
                    .as_ref()
                    .ok_or_else(|| anyhow!("replay mode needs feed.replay.candles_path"))?;

                Box::new(ReplayFeed::from_json_file(path)?)
            }
            ModeKind::Live => {
                let url = settings
                    .feed
                    .live
                    .url
                    .as_deref()
                    .ok_or_else(|| anyhow!("live mode needs feed.live.url"))?;

                Box::new(WebSocketFeed::new(url)?)
            }
        };

        feed.subscribe(&settings.instruments).await?;

        Ok(feed)
    }

    pub fn broker(mode: ModeKind) -> ScenarioBroker {
        tracing::info!(mode = %mode, "creating broker");

        match mode {
            ModeKind::Synthetic | ModeKind::Live => {
                ScenarioBroker::DryRun(Arc::new(DryRunBroker::default()))
            }
            ModeKind::Replay => ScenarioBroker::Simulated(Arc::new(SimulatedBroker::new())),
        }
    }

    pub fn vol_models(settings: &Settings) -> Result<Vec<DynVolatilityModel>> {
        let mut models: Vec<DynVolatilityModel> = Vec::new();

        for instrument in &settings.instruments {
            let per_instrument = Self::vol_models_for(settings, *instrument)
                .with_context(|| format!("vol models for {instrument}"))?;

            if settings.vol_models.composite && !per_instrument.is_empty() {
                models.push(Box::new(CompositeVolModel::new(per_instrument)?));
            } else {
                models.extend(per_instrument);
            }
        }

        tracing::info!(count = models.len(), "created vol models");
        Ok(models)
    }

    fn vol_models_for(
        settings: &Settings,
        instrument: InstrumentId,
    ) -> Result<Vec<DynVolatilityModel>> {
        let config = &settings.vol_models;
        let mut models: Vec<DynVolatilityModel> = Vec::new();

        if let Some(params) = config.realized {
            models.push(Box::new(RealizedVolModel::new(instrument, params)?));
        }
        if let Some(params) = config.ewma {
            models.push(Box::new(EwmaVolModel::new(instrument, params)?));
        }
        if let Some(params) = config.garch {
            models.push(Box::new(GarchVolModel::new(instrument, params)?));
        }
        if let Some(params) = config.atr {
            models.push(Box::new(AtrVolModel::new(instrument, params)?));
        }
        if let Some(params) = config.bollinger {
            models.push(Box::new(BollingerVolModel::new(instrument, params)?));
        }

        Ok(models)
    }

    /// One straddle and one condor per instrument, each when configured.
    pub fn strategies(settings: &Settings) -> Result<Vec<DynStrategy>> {
        let mut strategies: Vec<DynStrategy> = Vec::new();

        for instrument in &settings.instruments {
            if let Some(params) = settings.strategies.long_straddle {
                strategies.push(Box::new(LongStraddleStrategy::new(*instrument, params)?));
            }
            if let Some(params) = settings.strategies.short_condor {
                strategies.push(Box::new(ShortCondorStrategy::new(*instrument, params)?));
            }
        }

        tracing::info!(count = strategies.len(), "created strategies");
        Ok(strategies)
    }

    pub fn risk_filter(settings: &Settings) -> DynRiskFilter {
        let risk = &settings.risk;
        if !risk.has_checks() {
            return Box::new(PassThroughRiskFilter);
        }

        let mut checks: Vec<Box<dyn RiskCheck>> =
            vec![Box::new(KillSwitchCheck::new(risk.kill_switch))];
        if let Some(max_quantity) = risk.max_order_quantity {
            checks.push(Box::new(MaxOrderQuantityCheck::new(max_quantity)));
        }
        if let Some(max_net_position) = risk.max_net_position {
            checks.push(Box::new(NetPositionLimitCheck::new(max_net_position)));
        }

        Box::new(RiskEngine::new(checks))
    }

    /// Fully wired engine; the broker is returned alongside so callers can
    /// drive fills through [`ScenarioBroker::simulated`] or inspect positions.
    pub async fn engine(settings: &Settings) -> Result<(Engine, ScenarioBroker)> {
        let feed = Self::feed(settings).await?;
        let broker = Self::broker(settings.mode);

        let mut engine = Engine::new(
            feed,
            broker.shared(),
            Self::vol_models(settings)?,
            Self::strategies(settings)?,
            Self::risk_filter(settings),
        )
        .with_signal_dispatch(settings.engine.signal_dispatch)
        .with_event_loop(EventLoop::with_candle_capacity(settings.candles.capacity));

        if let Some(seconds) = settings.candles.interval_secs {
            let interval = i64::try_from(seconds)
                .ok()
                .and_then(TimeDelta::try_seconds)
                .ok_or_else(|| anyhow!("candles.interval_secs out of range: {seconds}"))?;
            engine = engine.with_candle_aggregator(CandleAggregator::new(interval));
        }

        Ok((engine, broker))
    }
}
