//! One-shot hardware peripheral initialization.
//!
//! Configures GPIO directions, the SPI2 bus with one device per thermocouple
//! converter, and the zero-cross edge interrupt, using raw ESP-IDF sys calls.
//! Called once from `main()` before the control loop starts.  Any failure
//! here is fatal — the oven must not run with partial sensing or actuation.
//!
//! Also exposes the two primitives the rest of the firmware consumes:
//! [`spi_read16`] (one 16-bit read transaction per converter) and
//! [`gpio_write`].  On host targets both collapse to simulation stubs.

use crate::error::{InitError, SensorError};

#[cfg(target_os = "espidf")]
use crate::pins;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
pub fn init_peripherals() -> Result<(), InitError> {
    // SAFETY: Called once from main() before the control loop or any ISR
    // exists; single-threaded at this point.
    unsafe {
        init_gpio_outputs()?;
        init_zcd_input()?;
        init_spi()?;
    }
    info!("hw_init: all peripherals configured");
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_peripherals() -> Result<(), InitError> {
    log::info!("hw_init(sim): peripheral init skipped");
    Ok(())
}

// ── GPIO outputs (heaters, status LED) ───────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_gpio_outputs() -> Result<(), InitError> {
    let mut mask = 1u64 << pins::STATUS_LED_GPIO;
    for &pin in &pins::HEATER_GPIOS {
        mask |= 1u64 << pin;
    }

    let cfg = gpio_config_t {
        pin_bit_mask: mask,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(InitError::GpioConfigFailed(ret));
    }

    for &pin in &pins::HEATER_GPIOS {
        // SSR gates want the strongest drive the C3 offers; start off.
        unsafe {
            gpio_set_drive_capability(pin, gpio_drive_cap_t_GPIO_DRIVE_CAP_3);
            gpio_set_level(pin, 0);
        }
    }
    unsafe { gpio_set_level(pins::STATUS_LED_GPIO, 0) };

    info!("hw_init: GPIO outputs configured (heaters off)");
    Ok(())
}

// ── Zero-cross detector input ────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe fn init_zcd_input() -> Result<(), InitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::ZCD_GPIO,
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        // Edge type is set when the ISR is registered.
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(InitError::GpioConfigFailed(ret));
    }
    Ok(())
}

// ── SPI2 bus + thermocouple devices ──────────────────────────

#[cfg(target_os = "espidf")]
static mut TC_SPI: [spi_device_handle_t; pins::TC_CS_GPIOS.len()] =
    [core::ptr::null_mut(); pins::TC_CS_GPIOS.len()];

/// SAFETY: `TC_SPI` is written once in `init_spi()` before the control loop
/// starts; afterwards only the control task reads it.
#[cfg(target_os = "espidf")]
unsafe fn tc_handle(device: usize) -> spi_device_handle_t {
    unsafe { TC_SPI[device] }
}

#[cfg(target_os = "espidf")]
unsafe fn init_spi() -> Result<(), InitError> {
    let mut bus_cfg = spi_bus_config_t::default();
    bus_cfg.__bindgen_anon_1.mosi_io_num = -1; // converters are read-only
    bus_cfg.__bindgen_anon_2.miso_io_num = pins::SPI_MISO_GPIO;
    bus_cfg.sclk_io_num = pins::SPI_SCK_GPIO;
    bus_cfg.__bindgen_anon_3.quadwp_io_num = -1;
    bus_cfg.__bindgen_anon_4.quadhd_io_num = -1;
    bus_cfg.max_transfer_sz = 32;
    bus_cfg.flags = SPICOMMON_BUSFLAG_MASTER;

    let ret = unsafe {
        spi_bus_initialize(
            spi_host_device_t_SPI2_HOST,
            &bus_cfg,
            spi_common_dma_t_SPI_DMA_DISABLED,
        )
    };
    if ret != ESP_OK as i32 {
        return Err(InitError::SpiBusInitFailed(ret));
    }

    for (i, &cs) in pins::TC_CS_GPIOS.iter().enumerate() {
        let dev_cfg = spi_device_interface_config_t {
            mode: 1, // MAX6675 clocks data out on the falling edge
            clock_speed_hz: pins::SPI_CLOCK_HZ,
            spics_io_num: cs,
            queue_size: 2,
            ..Default::default()
        };
        // SAFETY: TC_SPI is only written here, once at boot.
        let ret = unsafe { spi_bus_add_device(spi_host_device_t_SPI2_HOST, &dev_cfg, &raw mut TC_SPI[i]) };
        if ret != ESP_OK as i32 {
            return Err(InitError::SpiDeviceAddFailed(ret));
        }
    }

    info!("hw_init: SPI2 configured ({} thermocouple devices)", pins::TC_CS_GPIOS.len());
    Ok(())
}

/// Read one 16-bit frame from the given thermocouple converter.
///
/// A failed transaction is reported as [`SensorError::BusReadFailed`] for
/// this read only; no retries are attempted.
#[cfg(target_os = "espidf")]
pub fn spi_read16(device: usize) -> Result<u16, SensorError> {
    let mut data = [0u8; 2];
    let mut trans = spi_transaction_t {
        length: 16, // bits
        ..Default::default()
    };
    trans.__bindgen_anon_2.rx_buffer = data.as_mut_ptr().cast();

    // SAFETY: tc_handle() contract — handles were created during init_spi()
    // and this is only called from the single control task.
    let ret = unsafe { spi_device_transmit(tc_handle(device), &mut trans) };
    if ret != ESP_OK as i32 {
        return Err(SensorError::BusReadFailed);
    }
    Ok(u16::from_be_bytes(data))
}

#[cfg(not(target_os = "espidf"))]
pub fn spi_read16(_device: usize) -> Result<u16, SensorError> {
    Err(SensorError::BusReadFailed)
}

// ── GPIO writes ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
pub fn gpio_write(pin: i32, high: bool) {
    // SAFETY: gpio_set_level writes to an already-configured output pin;
    // register writes are atomic, so this is safe from ISR context too.
    unsafe {
        gpio_set_level(pin, if high { 1 } else { 0 });
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn gpio_write(_pin: i32, _high: bool) {}

// ── Zero-cross ISR registration ──────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn zcd_gpio_isr(_arg: *mut core::ffi::c_void) {
    crate::drivers::power::zero_cross_isr_handler();
}

/// Install the GPIO ISR service and register the zero-cross edge handler.
/// Call after [`init_peripherals`] and after the modulator is configured;
/// without this edge the heaters can never be driven, so failure is fatal.
#[cfg(target_os = "espidf")]
pub fn init_isr_service() -> Result<(), InitError> {
    // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
    // means it was already installed (acceptable).  The handler registered
    // below only touches atomics and GPIO level registers.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
            return Err(InitError::IsrInstallFailed(ret));
        }

        // ZCD optocoupler pulls low at each crossing: falling edge.
        gpio_set_intr_type(pins::ZCD_GPIO, gpio_int_type_t_GPIO_INTR_NEGEDGE);
        let ret = gpio_isr_handler_add(pins::ZCD_GPIO, Some(zcd_gpio_isr), core::ptr::null_mut());
        if ret != ESP_OK as i32 {
            return Err(InitError::IsrInstallFailed(ret));
        }
        gpio_intr_enable(pins::ZCD_GPIO);
    }
    info!("hw_init: zero-cross ISR registered on GPIO{}", pins::ZCD_GPIO);
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn init_isr_service() -> Result<(), InitError> {
    log::info!("hw_init(sim): ISR service skipped");
    Ok(())
}
