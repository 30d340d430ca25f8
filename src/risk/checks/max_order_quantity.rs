use crate::risk::context::RiskContext;
use crate::risk::decision::RiskReason;
use crate::risk::engine::RiskCheck;

#[derive(Debug, Clone)]
pub struct MaxOrderQuantityCheck {
    max_quantity: u32,
}

impl MaxOrderQuantityCheck {
    pub fn new(max_quantity: u32) -> Self {
        Self { max_quantity }
    }
}

impl RiskCheck for MaxOrderQuantityCheck {
    fn name(&self) -> &'static str {
        "MaxOrderQuantityCheck"
    }

    fn evaluate(&mut self, ctx: &RiskContext) -> Result<(), Vec<RiskReason>> {
        let quantity = ctx.action.quantity;
        if quantity > self.max_quantity {
            return Err(vec![RiskReason::QuantityLimit {
                quantity,
                max_quantity: self.max_quantity,
            }]);
        }
        Ok(())
    }
}
