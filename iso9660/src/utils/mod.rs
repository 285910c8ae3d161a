//! Utility functions for ISO9660 parsing

pub mod sector;
pub mod string;
