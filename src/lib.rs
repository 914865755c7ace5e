// apnskit - Apple Push Notification service toolkit
//
// This library re-exports the APNs client: credential loading, provider
// tokens, notification building and HTTP/2 delivery.

// Re-export the core crate
pub use apnskit_push::*;

/// Prelude for common imports.
pub mod prelude {
    pub use apnskit_push::prelude::*;
}
