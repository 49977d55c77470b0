//! Fling player discovery
//!
//! This crate turns a vendor [`DiscoveryController`](fling_api::DiscoveryController)
//! into a uniform stream of [`DiscoveryEvent`]s delivered on a caller-chosen
//! execution context.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use fling_discovery::{DiscoveryConfig, DiscoveryEvent, DiscoveryNormalizer};
//!
//! let normalizer = DiscoveryNormalizer::new(controller, DiscoveryConfig::default());
//! normalizer.add_observer(Arc::new(|event: &DiscoveryEvent| match event {
//!     DiscoveryEvent::DeviceFound(device) => println!("Found: {}", device.name()),
//!     DiscoveryEvent::DeviceUpdated(device) => println!("Updated: {}", device.name()),
//!     DiscoveryEvent::DeviceLost(device) => println!("Lost: {}", device.name()),
//!     DiscoveryEvent::DiscoveryFailed => println!("Discovery stopped"),
//! }));
//! normalizer.start()?;
//! ```
//!
//! A `DiscoveryFailed` event ends the session. The normalizer never retries;
//! call [`DiscoveryNormalizer::start`] again to begin a new one.

mod config;
mod error;
mod event;
mod normalizer;

pub use config::{DiscoveryConfig, SearchTarget};
pub use error::{DiscoveryError, Result};
pub use event::DiscoveryEvent;
pub use normalizer::{DiscoveryNormalizer, EventObserver, ObserverId, SessionState};
