use std::fmt;

use tracing::warn;

use crate::risk::context::RiskContext;
use crate::risk::decision::{RiskDecision, RiskReason};
use crate::types::trade_action::TradeAction;

/// Gate between the strategies and publication. Invoked exactly once per tick
/// with every candidate action of that tick; returns the allowed subset.
pub trait RiskFilter: Send {
    fn filter_actions(&mut self, actions: Vec<TradeAction>) -> Vec<TradeAction>;
}

pub type DynRiskFilter = Box<dyn RiskFilter>;

/// Lets everything through.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassThroughRiskFilter;

impl RiskFilter for PassThroughRiskFilter {
    fn filter_actions(&mut self, actions: Vec<TradeAction>) -> Vec<TradeAction> {
        actions
    }
}

pub trait RiskCheck: Send + Sync {
    fn name(&self) -> &'static str;
    fn evaluate(&mut self, context: &RiskContext) -> Result<(), Vec<RiskReason>>;

    /// Called once an action passed every check, for checks that track exposure.
    fn on_approved(&mut self, _context: &RiskContext) {}
}

pub struct RiskEngine {
    checks: Vec<Box<dyn RiskCheck>>,
}

impl RiskEngine {
    pub fn new(checks: Vec<Box<dyn RiskCheck>>) -> Self {
        Self { checks }
    }

    pub fn evaluate(&mut self, context: &RiskContext) -> RiskDecision {
        let mut reasons: Vec<RiskReason> = Vec::new();

        for check in &mut self.checks {
            if let Err(mut check_reasons) = check.evaluate(context) {
                reasons.append(&mut check_reasons);
            }
        }

        if !reasons.is_empty() {
            return RiskDecision::Rejected(reasons);
        }

        for check in &mut self.checks {
            check.on_approved(context);
        }
        RiskDecision::Approved
    }
}

impl RiskFilter for RiskEngine {
    fn filter_actions(&mut self, actions: Vec<TradeAction>) -> Vec<TradeAction> {
        let mut approved = Vec::with_capacity(actions.len());

        for action in actions {
            let context = RiskContext { action: &action };
            match self.evaluate(&context) {
                RiskDecision::Approved => approved.push(action),
                RiskDecision::Rejected(reasons) => {
                    let reasons: Vec<String> = reasons.iter().map(ToString::to_string).collect();
                    warn!(%action, ?reasons, "Risk rejected action");
                }
            }
        }

        approved
    }
}

impl fmt::Debug for RiskEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RiskEngine")
            .field("checks_count", &self.checks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::checks::{
        kill_switch::KillSwitchCheck, max_order_quantity::MaxOrderQuantityCheck,
        net_position_limit::NetPositionLimitCheck,
    };
    use crate::types::instrument::InstrumentId;
    use crate::types::trade_action::ActionKind;

    fn action(kind: ActionKind, quantity: u32) -> TradeAction {
        TradeAction::new(kind, InstrumentId::new(1), quantity)
    }

    #[test]
    fn test_pass_through_keeps_everything() {
        let actions = vec![
            action(ActionKind::OpenLong, 1),
            action(ActionKind::CloseShort, 3),
        ];

        let filtered = PassThroughRiskFilter.filter_actions(actions.clone());

        assert_eq!(filtered, actions);
    }

    #[test]
    fn test_kill_switch_lets_positions_unwind() {
        let mut engine = RiskEngine::new(vec![Box::new(KillSwitchCheck::new(true))]);

        let filtered = engine.filter_actions(vec![
            action(ActionKind::OpenLong, 1),
            action(ActionKind::CloseLong, 1),
            action(ActionKind::OpenShort, 1),
        ]);

        let kinds: Vec<_> = filtered.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ActionKind::CloseLong]);
    }

    #[test]
    fn test_rejections_preserve_order_of_survivors() {
        let mut engine = RiskEngine::new(vec![
            Box::new(KillSwitchCheck::new(false)),
            Box::new(MaxOrderQuantityCheck::new(2)),
        ]);

        let filtered = engine.filter_actions(vec![
            action(ActionKind::OpenLong, 1),
            action(ActionKind::OpenShort, 5),
            action(ActionKind::CloseLong, 2),
        ]);

        let kinds: Vec<_> = filtered.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ActionKind::OpenLong, ActionKind::CloseLong]);
    }

    #[test]
    fn test_net_position_limit_tracks_approved_exposure() {
        let mut engine = RiskEngine::new(vec![Box::new(NetPositionLimitCheck::new(2))]);

        let filtered = engine.filter_actions(vec![
            action(ActionKind::OpenLong, 1),
            action(ActionKind::OpenLong, 1),
            action(ActionKind::OpenLong, 1),
        ]);
        assert_eq!(filtered.len(), 2);

        // Reducing exposure is always allowed, and frees room again.
        let filtered = engine.filter_actions(vec![
            action(ActionKind::CloseLong, 2),
            action(ActionKind::OpenShort, 2),
            action(ActionKind::OpenShort, 1),
        ]);
        let kinds: Vec<_> = filtered.iter().map(|a| a.kind).collect();
        assert_eq!(kinds, vec![ActionKind::CloseLong, ActionKind::OpenShort]);
    }

    #[test]
    fn test_rejected_action_does_not_move_exposure() {
        let mut engine = RiskEngine::new(vec![
            Box::new(MaxOrderQuantityCheck::new(1)),
            Box::new(NetPositionLimitCheck::new(1)),
        ]);

        assert!(engine.filter_actions(vec![action(ActionKind::OpenLong, 5)]).is_empty());
        assert_eq!(engine.filter_actions(vec![action(ActionKind::OpenLong, 1)]).len(), 1);
    }

    #[test]
    fn test_evaluate_collects_every_reason() {
        let mut engine = RiskEngine::new(vec![
            Box::new(KillSwitchCheck::new(true)),
            Box::new(MaxOrderQuantityCheck::new(1)),
        ]);
        let candidate = action(ActionKind::OpenLong, 3);

        let decision = engine.evaluate(&RiskContext { action: &candidate });

        match decision {
            RiskDecision::Rejected(reasons) => {
                assert_eq!(reasons.len(), 2);
                assert_eq!(reasons[0], RiskReason::KillSwitchEnabled);
            }
            RiskDecision::Approved => panic!("expected rejection"),
        }
    }
}
