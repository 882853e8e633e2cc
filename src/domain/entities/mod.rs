pub mod field;
pub mod filter;
pub mod grid;
pub mod period;
pub mod table;
