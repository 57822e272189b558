//! # Game Implementations Module
//!
//! Board engines searched by the MCTS player.
//!
//! ## Supported Games
//! - **Connect 4**: Gravity-based connection game on a 6x7 grid for 2 players,
//!   with incremental winning-possibility tracking

pub mod connect4;
