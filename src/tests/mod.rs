//! Test modules for llm-bridge
//!
//! Each core source file has a corresponding test module here focused on
//! its business behavior; vendor-specific tests live next to the vendor
//! modules under `providers/`.

pub mod options;
pub mod stream;
