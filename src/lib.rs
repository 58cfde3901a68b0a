pub mod backtest;
pub mod calibration;
pub mod config;
pub mod elo;
pub mod engine;
pub mod expected_goals;
pub mod league;
pub mod league_params;
pub mod match_table;
pub mod names;
pub mod result;
pub mod standings;
pub mod strength;
