mod pair_saga;
mod reconcile_service_impl;
mod relationship_service_impl;

pub use pair_saga::*;
pub use reconcile_service_impl::*;
pub use relationship_service_impl::*;
