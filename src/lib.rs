//! Common functionality for hubplan, an optimiser for the staged design and
//! operation of multi-location energy hubs.
#![warn(missing_docs)]
pub mod calendar;
pub mod carrier;
pub mod commands;
pub mod finance;
pub mod id;
pub mod input;
pub mod location;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod scenario;
pub mod settings;
pub mod technology;

#[cfg(test)]
mod fixture;
