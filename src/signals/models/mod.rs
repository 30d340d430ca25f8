pub mod atr;
pub mod bollinger;
pub mod composite;
pub mod ewma;
pub mod garch;
pub mod realized;
