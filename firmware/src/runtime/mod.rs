//! ESP32 bring-up: clocks, radio, network stack, and task spawn.

use embassy_net::StackResources;
use embassy_time::{Duration, Ticker};
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::rng::Rng;
use esp_hal::timer::timg::TimerGroup;
use log::info;
use static_cell::StaticCell;

use crate::hw::RelayOutputs;
use crate::watchdog::TelemetryRecorder;
use crate::watchdog::orchestrator::Watchdog;
use crate::{config, net, status};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub fn run() -> ! {
    esp_println::logger::init_logger_from_env();

    let peripherals = esp_hal::init(esp_hal::Config::default());
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    esp_alloc::heap_allocator!(size: 96 * 1024);

    // Low drives the active-low relay inputs closed, so both devices are
    // powered from the very first instruction after reset.
    let relays = RelayOutputs::new(
        Output::new(peripherals.GPIO17, Level::Low, OutputConfig::default()),
        Output::new(peripherals.GPIO27, Level::Low, OutputConfig::default()),
    );

    static RADIO_CTRL: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
    static STACK_RESOURCES: StaticCell<StackResources<4>> = StaticCell::new();

    let radio_ctrl = RADIO_CTRL.init(esp_radio::init().expect("esp_radio::init"));
    let (controller, ifaces) = esp_radio::wifi::new(
        radio_ctrl,
        peripherals.WIFI,
        esp_radio::wifi::Config::default(),
    )
    .expect("wifi interface init");

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());
    let (stack, runner) = embassy_net::new(
        ifaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        STACK_RESOURCES.init(StackResources::<4>::new()),
        seed,
    );

    let mut executor = esp_rtos::embassy::Executor::new();
    let executor = unsafe { make_static(&mut executor) };
    executor.run(move |spawner| {
        spawner.must_spawn(net::net_task(runner));
        spawner.must_spawn(net::connection_task(controller));
        spawner.must_spawn(heartbeat_task());
        spawner.must_spawn(watchdog_task(stack, relays));
    });
}

#[embassy_executor::task]
async fn watchdog_task(stack: embassy_net::Stack<'static>, relays: RelayOutputs) {
    let mut telemetry = TelemetryRecorder::new();
    let watchdog = Watchdog::new(
        config::monitor_config(),
        net::StackLink::new(stack),
        net::IcmpProbe::new(stack),
        relays,
    );
    watchdog.run(&mut telemetry).await
}

/// Periodic proof-of-life with the counters an operator cares about.
#[embassy_executor::task]
async fn heartbeat_task() {
    let mut ticker = Ticker::every(HEARTBEAT_INTERVAL);
    loop {
        ticker.next().await;
        let snapshot = status::snapshot();
        info!(
            "heartbeat: failures={}/{} cycles={} verdict={:?} relays={:?}",
            snapshot.consecutive_failures,
            config::monitor_config().max_failures,
            snapshot.cycles_completed,
            snapshot.last_verdict,
            snapshot.relays,
        );
    }
}

unsafe fn make_static<T>(value: &mut T) -> &'static mut T {
    unsafe { core::mem::transmute(value) }
}
