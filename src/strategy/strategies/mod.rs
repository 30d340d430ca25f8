pub mod long_straddle;
pub mod short_condor;
