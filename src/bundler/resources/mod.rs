//! Resources derived from project assets.

pub mod icons;
