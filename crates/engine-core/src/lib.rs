pub mod retry;
pub mod state;
pub mod statistics;
