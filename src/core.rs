pub mod aggregator;
pub mod breakdown;
pub mod cache;
pub mod calculator;
pub mod engine;
pub mod netting;
pub mod quote;
pub mod ranker;
pub mod resolver;
pub mod tax;
