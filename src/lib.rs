//! Agent-based simulation of an infectious disease spreading through a
//! population placed in a bounded square area.
//!
//! An [`Engine`] is built from a validated [`Config`], run to termination
//! with [`Engine::run_sim`], and its per-step [`Report`] handed to whatever
//! prints or plots it.

pub mod config;
pub mod engine;
pub mod error;
pub mod health;
pub mod manager;
pub mod model;
pub mod report;
pub mod spatial;
pub mod stats;
pub mod transmission;

pub use config::Config;
pub use engine::Engine;
pub use error::SimError;
pub use report::{Report, Summary};
