pub mod counters;
pub mod health;
pub mod metrics;
pub mod tasks;
