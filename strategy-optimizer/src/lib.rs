pub mod driver;
pub mod objective;
pub mod optimization;
pub mod report;
