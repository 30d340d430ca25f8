use std::fmt;
use std::str::FromStr;

use anyhow::{Result, anyhow};
use clap::ValueEnum;
use serde::Deserialize;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModeKind {
    #[default]
    Synthetic,
    Replay,
    Live,
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Synthetic => write!(f, "synthetic"),
            Self::Replay => write!(f, "replay"),
            Self::Live => write!(f, "live"),
        }
    }
}

impl FromStr for ModeKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "synthetic" | "dummy" => Ok(Self::Synthetic),
            "replay" | "backtest" => Ok(Self::Replay),
            "live" => Ok(Self::Live),
            other => Err(anyhow!("unknown mode: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!("backtest".parse::<ModeKind>().unwrap(), ModeKind::Replay);
        assert_eq!("dummy".parse::<ModeKind>().unwrap(), ModeKind::Synthetic);
        assert_eq!(ModeKind::Live.to_string(), "live");
        assert!("paper".parse::<ModeKind>().is_err());
    }
}
