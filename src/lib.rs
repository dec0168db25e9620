//! Multi-gateway payment integration
//!
//! A PayZen SOAP client and the status tables that map every gateway's
//! vocabulary onto one canonical payment taxonomy.

pub mod config;
pub mod error;
pub mod payments;

pub use error::{AppError, AppErrorKind, AppResult};
pub use payments::types::{PaymentResult, Provider};

use tracing_subscriber::EnvFilter;

/// Install the global `tracing` subscriber
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Calling it twice is
/// harmless; the second call leaves the first subscriber in place.
pub fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
