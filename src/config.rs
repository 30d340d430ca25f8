use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::{
    engine::signal_dispatch::SignalDispatch,
    feeds::synthetic::SyntheticFeedParams,
    market::event_loop::DEFAULT_CANDLE_CAPACITY,
    scenario::modes::ModeKind,
    signals::models::{
        atr::AtrVolParams, bollinger::BollingerVolParams, ewma::EwmaVolParams,
        garch::GarchVolParams, realized::RealizedVolParams,
    },
    strategy::strategies::{long_straddle::LongStraddleParams, short_condor::ShortCondorParams},
    types::instrument::InstrumentId,
};

pub const FEED_URL_ENV: &str = "VOLPIPE_FEED_URL";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub mode: ModeKind,
    pub instruments: Vec<InstrumentId>,
    pub feed: FeedSettings,
    pub candles: CandleSettings,
    pub engine: EngineSettings,
    pub vol_models: VolModelSettings,
    pub strategies: StrategySettings,
    pub risk: RiskSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            mode: ModeKind::default(),
            instruments: vec![InstrumentId::new(256265)],
            feed: FeedSettings::default(),
            candles: CandleSettings::default(),
            engine: EngineSettings::default(),
            vol_models: VolModelSettings::default(),
            strategies: StrategySettings::default(),
            risk: RiskSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FeedSettings {
    pub synthetic: SyntheticFeedParams,
    pub replay: ReplaySettings,
    pub live: LiveSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReplaySettings {
    /// JSON array of candles.
    pub candles_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LiveSettings {
    pub url: Option<String>,
}

/// One week.
pub const MAX_CANDLE_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CandleSettings {
    /// Tick to candle bucketing; off when unset.
    pub interval_secs: Option<u64>,
    pub capacity: usize,
}

impl Default for CandleSettings {
    fn default() -> Self {
        Self {
            interval_secs: None,
            capacity: DEFAULT_CANDLE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub signal_dispatch: SignalDispatch,
}

/// One parameter block per enabled model, built for every instrument.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VolModelSettings {
    pub realized: Option<RealizedVolParams>,
    pub ewma: Option<EwmaVolParams>,
    pub garch: Option<GarchVolParams>,
    pub atr: Option<AtrVolParams>,
    pub bollinger: Option<BollingerVolParams>,
    /// Wrap each instrument's models into one majority-vote composite.
    pub composite: bool,
}

impl Default for VolModelSettings {
    fn default() -> Self {
        Self {
            realized: Some(RealizedVolParams::default()),
            ewma: None,
            garch: None,
            atr: None,
            bollinger: None,
            composite: false,
        }
    }
}

impl VolModelSettings {
    pub fn enabled_count(&self) -> usize {
        [
            self.realized.is_some(),
            self.ewma.is_some(),
            self.garch.is_some(),
            self.atr.is_some(),
            self.bollinger.is_some(),
        ]
        .into_iter()
        .filter(|enabled| *enabled)
        .count()
    }

    fn validate(&self) -> Result<()> {
        if let Some(params) = &self.realized {
            params.validate().context("vol_models.realized")?;
        }
        if let Some(params) = &self.ewma {
            params.validate().context("vol_models.ewma")?;
        }
        if let Some(params) = &self.garch {
            params.validate().context("vol_models.garch")?;
        }
        if let Some(params) = &self.atr {
            params.validate().context("vol_models.atr")?;
        }
        if let Some(params) = &self.bollinger {
            params.validate().context("vol_models.bollinger")?;
        }
        if self.composite && self.enabled_count() == 0 {
            bail!("vol_models.composite needs at least one model enabled");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StrategySettings {
    pub long_straddle: Option<LongStraddleParams>,
    pub short_condor: Option<ShortCondorParams>,
}

impl Default for StrategySettings {
    fn default() -> Self {
        Self {
            long_straddle: Some(LongStraddleParams::default()),
            short_condor: Some(ShortCondorParams::default()),
        }
    }
}

/// Without any limit configured the risk filter passes everything through.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RiskSettings {
    pub kill_switch: bool,
    pub max_order_quantity: Option<u32>,
    pub max_net_position: Option<i64>,
}

impl RiskSettings {
    pub fn has_checks(&self) -> bool {
        self.kill_switch || self.max_order_quantity.is_some() || self.max_net_position.is_some()
    }
}

static SETTINGS: OnceCell<Settings> = OnceCell::new();

impl Settings {
    pub const FILE_NAME: &'static str = "settings.yml";

    /// Reads, validates and caches the settings file. The first successful
    /// call wins; later calls return the cached settings.
    pub fn load(path: impl AsRef<Path>) -> Result<&'static Settings> {
        let path = path.as_ref();
        SETTINGS.get_or_try_init(|| {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read settings {}", path.display()))?;

            let mut settings = Self::from_yaml_str(&raw)
                .with_context(|| format!("failed to parse settings {}", path.display()))?;

            if let Ok(url) = env::var(FEED_URL_ENV) {
                settings.feed.live.url = Some(url);
            }

            settings
                .validate()
                .context("settings validation failed")?;

            Ok(settings)
        })
    }

    /// Parses without caching or environment overrides.
    pub fn from_yaml_str(raw: &str) -> Result<Settings> {
        let settings: Settings = serde_yaml::from_str(raw)?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.instruments.is_empty() {
            bail!("instruments must not be empty");
        }
        if self.candles.capacity == 0 {
            bail!("candles.capacity must be > 0");
        }
        if let Some(seconds) = self.candles.interval_secs {
            if seconds == 0 || seconds > MAX_CANDLE_INTERVAL_SECS {
                bail!(
                    "candles.interval_secs must be in 1..={MAX_CANDLE_INTERVAL_SECS}, got {seconds}"
                );
            }
        }
        self.feed
            .synthetic
            .validate()
            .context("feed.synthetic")?;
        self.vol_models.validate()?;
        if let Some(params) = &self.strategies.long_straddle {
            params.validate().context("strategies.long_straddle")?;
        }
        if let Some(params) = &self.strategies.short_condor {
            params.validate().context("strategies.short_condor")?;
        }
        if matches!(self.risk.max_net_position, Some(limit) if limit <= 0) {
            bail!("risk.max_net_position must be > 0");
        }
        Ok(())
    }
}
