//! One-shot peripheral initialisation and raw ESP-IDF access.
//!
//! Configures the peak ADC channel and the two edge inputs using raw
//! ESP-IDF sys calls.  Called once from `main()` before the dispatcher
//! starts.  Everything the ISRs touch is an atomic.

use core::sync::atomic::{AtomicU32, Ordering};

use esp_idf_svc::sys::*;
use log::info;

use crate::app::ports::Line;
use crate::pins;

// ── Error type ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwInitError {
    AdcInitFailed(i32),
    GpioConfigFailed(i32),
    IsrInstallFailed(i32),
}

impl core::fmt::Display for HwInitError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::AdcInitFailed(rc) => write!(f, "ADC1 init failed (rc={})", rc),
            Self::GpioConfigFailed(rc) => write!(f, "GPIO config failed (rc={})", rc),
            Self::IsrInstallFailed(rc) => write!(f, "GPIO ISR service install failed (rc={})", rc),
        }
    }
}

impl std::error::Error for HwInitError {}

pub fn init_peripherals() -> Result<(), HwInitError> {
    // SAFETY: called once from main() before the dispatcher; single-threaded.
    unsafe {
        init_adc()?;
        init_edge_inputs()?;
        init_clear_mode()?;
    }
    info!("hw_init: peripherals configured");
    Ok(())
}

// ── ADC (oneshot) ─────────────────────────────────────────────

static mut ADC1_HANDLE: adc_oneshot_unit_handle_t = core::ptr::null_mut();

/// SAFETY: the handle is written once in `init_adc()` before the
/// dispatcher starts and only read from the dispatcher task afterwards.
unsafe fn adc1_handle() -> adc_oneshot_unit_handle_t {
    unsafe { ADC1_HANDLE }
}

unsafe fn init_adc() -> Result<(), HwInitError> {
    let init_cfg = adc_oneshot_unit_init_cfg_t {
        unit_id: adc_unit_t_ADC_UNIT_1,
        ulp_mode: adc_ulp_mode_t_ADC_ULP_MODE_DISABLE,
        ..Default::default()
    };
    // SAFETY: ADC1_HANDLE is only written here, once at boot.
    let ret = unsafe { adc_oneshot_new_unit(&init_cfg, &raw mut ADC1_HANDLE) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    let chan_cfg = adc_oneshot_chan_cfg_t {
        atten: adc_atten_t_ADC_ATTEN_DB_12,
        bitwidth: adc_bitwidth_t_ADC_BITWIDTH_12,
    };
    let ret = unsafe { adc_oneshot_config_channel(adc1_handle(), pins::PEAK_ADC_CHANNEL, &chan_cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::AdcInitFailed(ret));
    }

    info!("hw_init: ADC1 CH{} configured (peak hold)", pins::PEAK_ADC_CHANNEL);
    Ok(())
}

/// Fill `out` with back-to-back conversions spaced by
/// `pins::TIMED_READ_SPACING_US`.  A failed conversion reads as 0.
pub fn adc_read_timed(out: &mut [u16]) {
    for s in out.iter_mut() {
        let mut raw: i32 = 0;
        // SAFETY: adc1_handle() contract, dispatcher task only.
        let ret = unsafe { adc_oneshot_read(adc1_handle(), pins::PEAK_ADC_CHANNEL, &mut raw) };
        *s = if ret == ESP_OK as i32 { raw.max(0) as u16 } else { 0 };
        // SAFETY: ROM busy-wait, no shared state.
        unsafe { esp_rom_delay_us(pins::TIMED_READ_SPACING_US) };
    }
}

// ── Clear mode ────────────────────────────────────────────────

unsafe fn init_clear_mode() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: 1u64 << pins::CLEAR_MODE_GPIO,
        mode: gpio_mode_t_GPIO_MODE_OUTPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }
    // Manual clearing disabled; the rate ISR strobes the clear line.
    unsafe { gpio_set_level(pins::CLEAR_MODE_GPIO, 1) };
    Ok(())
}

// ── Edge inputs ───────────────────────────────────────────────

static BURST_EDGES: AtomicU32 = AtomicU32::new(0);
static RATE_EDGES: AtomicU32 = AtomicU32::new(0);

unsafe extern "C" fn burst_edge_isr(_arg: *mut core::ffi::c_void) {
    BURST_EDGES.fetch_add(1, Ordering::Relaxed);
}

unsafe extern "C" fn rate_edge_isr(_arg: *mut core::ffi::c_void) {
    RATE_EDGES.fetch_add(1, Ordering::Relaxed);
}

unsafe fn init_edge_inputs() -> Result<(), HwInitError> {
    let cfg = gpio_config_t {
        pin_bit_mask: (1u64 << pins::BURST_EDGE_GPIO) | (1u64 << pins::RATE_EDGE_GPIO),
        mode: gpio_mode_t_GPIO_MODE_INPUT,
        pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
        pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
        intr_type: gpio_int_type_t_GPIO_INTR_POSEDGE,
    };
    let ret = unsafe { gpio_config(&cfg) };
    if ret != ESP_OK as i32 {
        return Err(HwInitError::GpioConfigFailed(ret));
    }

    // SAFETY: ESP_ERR_INVALID_STATE means the service is already
    // installed.  Handlers only bump an atomic.
    unsafe {
        let ret = gpio_install_isr_service(0);
        if ret != ESP_OK && ret != ESP_ERR_INVALID_STATE {
            return Err(HwInitError::IsrInstallFailed(ret));
        }
        gpio_isr_handler_add(pins::BURST_EDGE_GPIO, Some(burst_edge_isr), core::ptr::null_mut());
        gpio_isr_handler_add(pins::RATE_EDGE_GPIO, Some(rate_edge_isr), core::ptr::null_mut());
        gpio_intr_disable(pins::BURST_EDGE_GPIO);
        gpio_intr_disable(pins::RATE_EDGE_GPIO);
    }

    info!("hw_init: edge inputs armed (burst GPIO{}, rate GPIO{})", pins::BURST_EDGE_GPIO, pins::RATE_EDGE_GPIO);
    Ok(())
}

fn edge_gpio(line: Line) -> (i32, &'static AtomicU32) {
    match line {
        Line::Burst => (pins::BURST_EDGE_GPIO, &BURST_EDGES),
        Line::Rate => (pins::RATE_EDGE_GPIO, &RATE_EDGES),
    }
}

/// Clear any stale latched edges and unmask the line.
pub fn edge_enable(line: Line) {
    let (gpio, latched) = edge_gpio(line);
    latched.store(0, Ordering::Relaxed);
    // SAFETY: pin configured in init_edge_inputs().
    unsafe { gpio_intr_enable(gpio) };
}

pub fn edge_disable(line: Line) {
    let (gpio, _) = edge_gpio(line);
    // SAFETY: pin configured in init_edge_inputs().
    unsafe { gpio_intr_disable(gpio) };
}

/// Edges latched since the previous call.
pub fn edge_take(line: Line) -> u32 {
    edge_gpio(line).1.swap(0, Ordering::AcqRel)
}

// ── Clock ─────────────────────────────────────────────────────

pub fn now_us() -> u64 {
    // SAFETY: RTC counter read.
    unsafe { esp_timer_get_time() as u64 }
}

pub fn delay_us(us: u32) {
    // SAFETY: ROM busy-wait, no shared state.
    unsafe { esp_rom_delay_us(us) };
}
