//! Logging and tracing for kiln.
//!
//! Sets up a `tracing-subscriber` stack filtered by `RUST_LOG` and provides
//! span constructors shared by the materialization and resolution layers.

pub mod spans;
pub mod tracer;

pub use spans::{asset_span, resolve_span, store_span};
pub use tracer::{LogFormat, TracerError, TracingConfig, init_tracing};
