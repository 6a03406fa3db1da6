pub mod loader;
pub mod types;

pub use loader::{LoaderError, PriceLoader, CLOSE_COLUMNS, DATE_COLUMNS};
pub use types::{PricePoint, PriceSeries, ReturnSeries};
