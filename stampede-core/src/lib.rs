#![cfg_attr(docsrs, feature(doc_cfg))]
//! Plain data types shared by the stampede harness and anything reporting on it.
mod config;
mod constants;
mod data;
mod error;
mod stats;

pub use config::*;
pub use constants::*;
pub use data::*;
pub use error::*;
pub use stats::*;
