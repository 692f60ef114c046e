pub mod level;
pub mod monitor;
pub mod segment;
