//! Configuration structures for release packaging.
//!
//! This module provides the configuration types shared by every target job:
//! package metadata, platform-specific settings, and a builder for
//! constructing the immutable [`Settings`] value.

mod arch;
mod builder;
mod bundle;
mod core;
mod linux;
mod macos;
mod package;
mod windows;

// Re-export all public types
pub use arch::Arch;
pub use builder::SettingsBuilder;
pub use bundle::BundleSettings;
pub use core::{DEFAULT_NOTARIZATION_TIMEOUT, Settings};
pub use linux::DebianSettings;
pub use macos::MacOsSettings;
pub use package::PackageSettings;
pub use windows::WindowsSettings;
