mod caching;
mod installed;
mod marketplace;
mod registry_index;

pub use caching::CachingProvider;
pub use installed::InstalledState;
pub use marketplace::MarketplaceProvider;
pub use registry_index::RegistryIndex;
