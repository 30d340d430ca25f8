pub mod modes;
pub mod scenario;
