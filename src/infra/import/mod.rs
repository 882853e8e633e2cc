pub mod csv;
pub mod memory;
pub mod xlsx;
