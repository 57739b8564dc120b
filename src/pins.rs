//! GPIO / peripheral pin assignments for the oven controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

// ---------------------------------------------------------------------------
// Heater SSRs (zero-cross solid-state relays, one per element)
// ---------------------------------------------------------------------------

/// Digital outputs driving the heater SSR gates (active HIGH).
/// Both elements switch together; two pins keep the gate current per GPIO
/// inside the C3's drive limit.
pub const HEATER_GPIOS: [i32; 2] = [7, 6];

// ---------------------------------------------------------------------------
// Zero-cross detector
// ---------------------------------------------------------------------------

/// Digital input from the mains zero-cross detector (optocoupler, open
/// collector).  Pulled up; pulses LOW once per AC cycle.
pub const ZCD_GPIO: i32 = 4;

// ---------------------------------------------------------------------------
// Thermocouple converters (MAX6675, shared SPI2 bus)
// ---------------------------------------------------------------------------

/// SPI2 MISO — the MAX6675 is read-only, no MOSI is wired.
pub const SPI_MISO_GPIO: i32 = 0;
/// SPI2 SCK.
pub const SPI_SCK_GPIO: i32 = 10;
/// Chip selects, one per converter.
pub const TC_CS_GPIOS: [i32; 2] = [1, 3];

/// SPI clock for the converters (datasheet maximum is 4.3 MHz).
pub const SPI_CLOCK_HZ: i32 = 4_000_000;

// ---------------------------------------------------------------------------
// Status LED
// ---------------------------------------------------------------------------

/// Heartbeat LED, toggled once per control tick.
pub const STATUS_LED_GPIO: i32 = 5;
