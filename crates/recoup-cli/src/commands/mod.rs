pub mod data;
pub mod input;
pub mod predict;
pub mod train;
