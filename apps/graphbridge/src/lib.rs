//! # graphbridge
//!
//! Command-line front end for graphbridge-core.

pub mod cli;
