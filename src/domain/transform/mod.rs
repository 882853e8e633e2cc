pub mod canonical;
pub mod cells;
pub mod filter;
pub mod hierarchy;
pub mod parts;
pub mod period;
pub mod region;
pub mod trend;
