//! adbrain: an automated ad-campaign operator.
//!
//! For one account it reads campaign state and yesterday's metrics from the
//! ads platform, asks a reasoning engine for optimization actions, validates
//! them against a closed action vocabulary and budget limits, optionally
//! dispatches them to an executor once per idempotency key, and delivers a
//! report over Telegram.
//!
//! See `DESIGN.md` for the module map.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actions;
pub mod brain;

pub mod executor;
pub mod platform;
pub mod providers;
pub mod store;
pub mod telegram;

pub mod app;
pub mod config;
pub mod http;
pub mod logging;
pub mod server;
