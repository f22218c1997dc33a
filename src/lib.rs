pub mod backtest;
pub mod badges;
pub mod fixture;
pub mod model;
pub mod rolling;
pub mod settings;
pub mod sweep;
pub mod synthetic;
