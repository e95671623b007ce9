//! Domain types shared by the indicator, strategy and engine layers.

mod bar;
mod equity;
mod position;
mod series;
mod trade;

pub use bar::Bar;
pub use equity::EquityPoint;
pub use position::Position;
pub use series::BarSeries;
pub use trade::{ExitReason, Fill, Side, Trade};
