//! sigtest: signal strategy backtester and risk metrics engine.
//!
//! Hexagonal architecture: pure computation in [`domain`], port traits in
//! [`ports`], concrete implementations in [`adapters`], and the command line
//! front end in [`cli`].

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod ports;
