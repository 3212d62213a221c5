//! Command-line front end for `vmnet-conf-core`.
//!
//! - [`settings`] loads default file locations from a TOML settings file.
//! - [`lookup`] finds every address bound to a hardware address across the
//!   parsed files.
//! - [`report`] renders parsed models for the terminal.

pub mod lookup;
pub mod report;
pub mod settings;
