pub mod portfolio;
pub mod rule;
pub mod trading_signal;

pub use portfolio::*;
pub use rule::*;
pub use trading_signal::*;
