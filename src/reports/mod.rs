pub mod generator;
pub mod runner;
pub mod strategy;
