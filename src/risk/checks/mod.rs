pub mod kill_switch;
pub mod max_order_quantity;
pub mod net_position_limit;
