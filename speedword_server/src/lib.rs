pub mod assigner;
pub mod config;
pub mod errors;
pub mod game_state;
pub mod session;
pub mod transport;
