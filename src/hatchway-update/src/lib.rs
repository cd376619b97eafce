//! Hatchway Update - decides whether a client should update.
//!
//! Provides:
//! - Semantic version validation and precedence comparison
//! - Channel resolution: fetching and validating a channel's `latest.json`
//! - The update decision and the payload handed back to clients
//!
//! # Example
//!
//! ```rust,ignore
//! use hatchway_update::{ChannelResolver, Scheme, decide, parse_version};
//!
//! let release = resolver.resolve("stable-darwin-x64").await?;
//! let requested = parse_version("3.3.1").ok_or(...)?;
//!
//! match decide(&requested, &release, Scheme::Https, "updates.example.com") {
//!     UpdateDecision::NoUpdate => { /* 204 */ }
//!     UpdateDecision::Available(payload) => { /* 200 + JSON */ }
//! }
//! ```

#![deny(clippy::print_stdout, clippy::print_stderr)]

mod channel;
mod config;
mod decision;
mod error;
mod key;
mod version;

pub use channel::{ChannelResolver, DESCRIPTOR_FILE, Release};
pub use config::{BucketLocation, ParseSchemeError, Scheme};
pub use decision::{UpdateDecision, UpdatePayload, build_url, decide};
pub use error::{UpdateError, UpdateResult};
pub use key::{join_key, prefixed_key};
pub use version::{VersionComparison, compare_parsed, compare_versions, is_valid, parse_version};

/// Path segment under which build artifacts are served.
pub const BUILD_SEGMENT: &str = "build";
