mod libs;
mod order;
mod reason;
mod resolve;
mod search;
mod types;

pub use reason::{FailKind, FailReason};
pub use resolve::DependencyResolver;
pub use types::{
    DependencyPath, ExtensionNode, ExtensionRef, LibChoice, ResolverConfig, TrackableLibDependency,
};

#[cfg(test)]
mod tests;
