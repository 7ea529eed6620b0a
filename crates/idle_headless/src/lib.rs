//! Headless engine runner for CI and balance checks.
//!
//! This crate drives [`idle_core`] without any rendering backend:
//!
//! - **Seeded runs**: simulate N frames and report what happened
//! - **Offline projection**: load a save and apply offline progress
//! - **Catalog validation**: check RON building and pet catalogs
//!
//! # Output
//!
//! - **stdout**: JSON reports, one object per command
//! - **stderr**: tracing logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Simulate ten minutes at 60 fps and keep the result
//! cargo run -p idle_headless -- run --seed 7 --frames 36000 --dt 16 --save save.json
//!
//! # See what a day away from that save is worth
//! cargo run -p idle_headless -- offline --save save.json --hours 24
//!
//! # Check a modded catalog
//! cargo run -p idle_headless -- validate --buildings data/buildings.ron
//! ```

pub mod error;
pub mod runner;
pub mod validate;

pub use error::{HeadlessError, Result};
pub use runner::{RunConfig, RunSummary};
