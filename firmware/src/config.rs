#![cfg_attr(not(target_os = "none"), allow(dead_code))]

//! Deployment configuration baked in at compile time.
//!
//! The watchdog sits unattended behind the router it reboots, so there is no
//! provisioning surface: Wi-Fi credentials and the monitoring policy are fixed
//! when the image is built.

use watchdog_core::monitor::MonitorConfig;

/// Wi-Fi credentials compiled in from the build environment.
///
/// Returns `None` when no SSID was provided, in which case the firmware idles
/// with both relays energized instead of guessing at a network.
pub fn wifi_credentials() -> Option<(&'static str, &'static str)> {
    let ssid = option_env!("WATCHDOG_WIFI_SSID").or(option_env!("SSID"))?;
    let password = option_env!("WATCHDOG_WIFI_PASSWORD")
        .or(option_env!("PASSWORD"))
        .unwrap_or("");
    Some((ssid, password))
}

/// Monitoring policy used by the deployed watchdog.
pub const fn monitor_config() -> MonitorConfig {
    MonitorConfig::DEFAULT
}
