//! Wi-Fi association and ICMP reachability probing.
//!
//! A dedicated task keeps the station joined to the configured access point;
//! the watchdog observes the result through the shared network stack. Echo
//! probes ride the same stack via the `embassy-net` ICMP socket.

use core::net::Ipv4Addr;

use embassy_net::icmp::PacketMetadata;
use embassy_net::icmp::ping::{PingManager, PingParams};
use embassy_net::{IpAddress, Runner, Stack};
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::{info, warn};

use crate::config;
use crate::watchdog::orchestrator::{NetworkLink, ReachabilityProbe};

const PING_TIMEOUT: Duration = Duration::from_secs(2);
const PING_PAYLOAD: &[u8] = b"internet-watchdog";
const JOIN_RETRY_DELAY: Duration = Duration::from_secs(3);

/// Network link view backed by the shared `embassy-net` stack.
#[derive(Copy, Clone)]
pub struct StackLink {
    stack: Stack<'static>,
}

impl StackLink {
    pub fn new(stack: Stack<'static>) -> Self {
        Self { stack }
    }
}

impl NetworkLink for StackLink {
    fn is_associated(&self) -> bool {
        self.stack.is_link_up() && self.stack.is_config_up()
    }

    async fn associate(&mut self) {
        // The connection task owns rejoin attempts; this only waits for the
        // stack to become usable again, DHCP lease included.
        self.stack.wait_link_up().await;
        self.stack.wait_config_up().await;
    }
}

/// ICMP echo probe over the shared stack.
#[derive(Copy, Clone)]
pub struct IcmpProbe {
    stack: Stack<'static>,
}

impl IcmpProbe {
    pub fn new(stack: Stack<'static>) -> Self {
        Self { stack }
    }
}

impl ReachabilityProbe for IcmpProbe {
    async fn probe(&mut self, host: Ipv4Addr, attempts: u8) -> bool {
        let mut rx_meta = [PacketMetadata::EMPTY; 2];
        let mut tx_meta = [PacketMetadata::EMPTY; 2];
        let mut rx_buffer = [0u8; 256];
        let mut tx_buffer = [0u8; 256];
        let mut manager = PingManager::new(
            self.stack,
            &mut rx_meta,
            &mut rx_buffer,
            &mut tx_meta,
            &mut tx_buffer,
        );

        let mut params = PingParams::new(IpAddress::Ipv4(host));
        params.set_payload(PING_PAYLOAD);
        params.set_count(1);
        params.set_timeout(PING_TIMEOUT);

        for attempt in 1..=attempts {
            match manager.ping(&params).await {
                Ok(rtt) => {
                    info!(
                        "probe: {host} answered in {}ms (attempt {attempt}/{attempts})",
                        rtt.as_millis()
                    );
                    return true;
                }
                Err(err) => {
                    warn!("probe: {host} attempt {attempt}/{attempts} failed: {err:?}");
                }
            }
        }
        false
    }
}

/// Keeps the station associated with the configured access point.
#[embassy_executor::task]
pub async fn connection_task(mut controller: WifiController<'static>) {
    let Some((ssid, password)) = config::wifi_credentials() else {
        warn!("wifi: no credentials compiled in; set WATCHDOG_WIFI_SSID and WATCHDOG_WIFI_PASSWORD");
        return;
    };
    info!("wifi: joining ssid={ssid}");

    let mut config_applied = false;
    loop {
        if !config_applied {
            let client = ClientConfig::default()
                .with_ssid(ssid.into())
                .with_password(password.into());
            if let Err(err) = controller.set_config(&ModeConfig::Client(client)) {
                warn!("wifi: station config err={err:?}");
                Timer::after(JOIN_RETRY_DELAY).await;
                continue;
            }
            config_applied = true;
        }

        match controller.is_started() {
            Ok(true) => {}
            Ok(false) => {
                if let Err(err) = controller.start_async().await {
                    warn!("wifi: start err={err:?}");
                    Timer::after(JOIN_RETRY_DELAY).await;
                    continue;
                }
            }
            Err(err) => {
                warn!("wifi: status err={err:?}");
                Timer::after(JOIN_RETRY_DELAY).await;
                continue;
            }
        }

        match controller.connect_async().await {
            Ok(()) => {
                info!("wifi: connected ssid={ssid}");
                controller.wait_for_event(WifiEvent::StaDisconnected).await;
                warn!("wifi: disconnected, rejoining");
            }
            Err(err) => {
                warn!("wifi: connect err={err:?}");
                Timer::after(JOIN_RETRY_DELAY).await;
            }
        }
    }
}

/// Drives the `embassy-net` stack.
#[embassy_executor::task]
pub async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
