use std::fmt;

use crate::types::instrument::InstrumentId;

#[derive(Debug, Clone, PartialEq)]
pub enum RiskReason {
    KillSwitchEnabled,
    QuantityLimit {
        quantity: u32,
        max_quantity: u32,
    },
    NetPositionLimit {
        instrument: InstrumentId,
        projected: i64,
        max_net_position: i64,
    },
}

impl fmt::Display for RiskReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskReason::KillSwitchEnabled => write!(f, "kill switch enabled"),
            RiskReason::QuantityLimit {
                quantity,
                max_quantity,
            } => write!(f, "quantity {quantity} exceeds max {max_quantity}"),
            RiskReason::NetPositionLimit {
                instrument,
                projected,
                max_net_position,
            } => write!(
                f,
                "net position on {instrument} would be {projected}, limit {max_net_position}"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RiskDecision {
    Approved,
    Rejected(Vec<RiskReason>),
}
