//! Domain types shared by every RobustLab crate.

pub mod bar;
pub mod ids;
pub mod series;

pub use bar::Bar;
pub use ids::{ConfigHash, DatasetHash, RunId};
pub use series::{cumulative_returns, equity_from_returns, returns_from_prices};
