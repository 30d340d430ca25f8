use crate::risk::context::RiskContext;
use crate::risk::decision::RiskReason;
use crate::risk::engine::RiskCheck;

/// Blocks new exposure while engaged. Closing actions still pass so open
/// structures can be unwound.
#[derive(Debug, Clone)]
pub struct KillSwitchCheck {
    engaged: bool,
}

impl KillSwitchCheck {
    pub fn new(engaged: bool) -> Self {
        Self { engaged }
    }
}

impl RiskCheck for KillSwitchCheck {
    fn name(&self) -> &'static str {
        "KillSwitchCheck"
    }

    fn evaluate(&mut self, ctx: &RiskContext) -> Result<(), Vec<RiskReason>> {
        if self.engaged && ctx.action.kind.is_opening() {
            return Err(vec![RiskReason::KillSwitchEnabled]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::instrument::InstrumentId;
    use crate::types::trade_action::{ActionKind, TradeAction};

    fn verdict(check: &mut KillSwitchCheck, kind: ActionKind) -> Result<(), Vec<RiskReason>> {
        let action = TradeAction::new(kind, InstrumentId::new(1), 1);
        check.evaluate(&RiskContext { action: &action })
    }

    #[test]
    fn test_disengaged_passes_everything() {
        let mut check = KillSwitchCheck::new(false);
        assert!(verdict(&mut check, ActionKind::OpenLong).is_ok());
        assert!(verdict(&mut check, ActionKind::OpenShort).is_ok());
    }

    #[test]
    fn test_engaged_blocks_opens_only() {
        let mut check = KillSwitchCheck::new(true);
        assert_eq!(
            verdict(&mut check, ActionKind::OpenShort),
            Err(vec![RiskReason::KillSwitchEnabled])
        );
        assert!(verdict(&mut check, ActionKind::CloseLong).is_ok());
        assert!(verdict(&mut check, ActionKind::CloseShort).is_ok());
    }
}
