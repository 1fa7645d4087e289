//! Service layer

mod reconciler;

pub use reconciler::Reconciler;
