use epaper_hal::epdif::{BusConfig, EpdIf, EpdLink, LinkConfig, PinConfig, Platform};

/// First command sent after reset: Driver Output Control
const DRIVER_OUTPUT_CONTROL: u8 = 0x01;

/// SPI Clock pin
#[cfg(target_os = "espidf")]
const SCK: i32 = 12;
/// SPI Master Out Slave In
#[cfg(target_os = "espidf")]
const MOSI: i32 = 11;
/// CS, DC, RST and BUSY on the ESP32-S3 board
#[cfg(target_os = "espidf")]
const BOARD_PINS: PinConfig<i32> = PinConfig::new(45, 46, 47, 48);

/// Reset the panel, wait for it and send the first command
fn bring_up<P: Platform>(
    platform: &mut P,
    pins: PinConfig<P::PinId>,
) -> anyhow::Result<EpdLink<P>> {
    let hal = EpdIf::init(platform, pins, &BusConfig::default())?;
    let mut link = EpdLink::new(hal, LinkConfig::default());

    log::info!("Resetting panel");
    link.reset()?;
    link.wait_until_idle()?;

    log::info!("Sending first command 0x{:02X}", DRIVER_OUTPUT_CONTROL);
    link.cmd(DRIVER_OUTPUT_CONTROL)?;
    Ok(link)
}

// https://docs.esp-rs.org/esp-idf-svc/esp_idf_svc/
#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    use epaper_hal::epdif::esp::EspPlatform;
    use esp_idf_svc::hal::peripherals::Peripherals;

    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    let peripherals = Peripherals::take()?;
    let mut platform = EspPlatform::new(peripherals.pins, peripherals.spi2, SCK, MOSI)?;

    let _link = bring_up(&mut platform, BOARD_PINS)?;

    log::info!("Panel is listening");
    Ok(())
}

/// Off target the same sequence runs against the simulated board.
#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    use embedded_hal::digital::PinState;
    use epaper_hal::epdif::sim::SimPlatform;

    let mut platform = SimPlatform::new();
    let probe = platform.probe();
    let pins = PinConfig::default();
    probe.script_levels(pins.busy, [PinState::High, PinState::Low]);

    let _link = bring_up(&mut platform, pins)?;

    for event in probe.events() {
        println!("{:?}", event);
    }
    Ok(())
}
