#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

mod config;
mod status;
mod watchdog;

#[cfg(target_os = "none")]
mod hw;
#[cfg(target_os = "none")]
mod net;
#[cfg(target_os = "none")]
mod runtime;

#[cfg(target_os = "none")]
use esp_backtrace as _;

#[cfg(target_os = "none")]
#[esp_hal::main]
fn main() -> ! {
    runtime::run()
}

#[cfg(not(target_os = "none"))]
fn main() {}
