pub mod holding;
pub mod quote;

pub use holding::Holding;
pub use quote::QuoteSeries;
