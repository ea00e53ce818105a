mod reconcile_service;
mod relationship_service;

pub use reconcile_service::*;
pub use relationship_service::*;
