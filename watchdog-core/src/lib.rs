#![no_std]

// Shared logic for the internet watchdog.
//
// This crate stays portable across MCU firmware and host tooling by avoiding
// the Rust standard library. Everything that can be decided without touching
// hardware lives here: the reachability failure policy, the relay catalog and
// power-cycle template, the cycle state machine, and the telemetry ring.

pub mod cycle;
pub mod monitor;
pub mod relays;
pub mod telemetry;
