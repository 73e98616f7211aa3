pub mod fixture;
pub mod http;
pub mod static_provider;

pub use fixture::{FixtureDataProvider, FixtureEntry, FixtureError};
pub use http::HttpDataProvider;
pub use static_provider::StaticDataProvider;
