//! # Blinker Demo Firmware
//!
//! STM32F4Discovery demo: two LED tasks driven by the scheduler, each
//! toggling its pin and sleeping between phases (400 ticks on, 1000 ticks
//! off at the 1 kHz tick — the classic embedded "hello world"), plus a
//! low-priority heartbeat that just yields.
//!
//! The firmware builds only for bare-metal ARM; on a development machine
//! this binary is an empty stub so `cargo test` links cleanly.

#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_std)]
#![cfg_attr(all(target_arch = "arm", target_os = "none"), no_main)]

#[cfg(all(target_arch = "arm", target_os = "none"))]
mod firmware {
    use cortex_m_rt::entry;
    use panic_halt as _;

    use coros::error::FaultKind;
    use coros::kernel;
    use coros::scheduler::PreemptPolicy;
    use coros::task::TaskId;

    // ----------------------------------------------------------------------
    // Minimal GPIO access (STM32F407, GPIOD — the Discovery board LEDs)
    // ----------------------------------------------------------------------

    const RCC_AHB1ENR: *mut u32 = 0x4002_3830 as *mut u32;
    const GPIOD_MODER: *mut u32 = 0x4002_0C00 as *mut u32;
    const GPIOD_BSRR: *mut u32 = 0x4002_0C18 as *mut u32;

    const LED_GREEN: u32 = 12;
    const LED_ORANGE: u32 = 13;

    fn gpio_init(pins: &[u32]) {
        unsafe {
            // Clock GPIOD, then switch each pin to general-purpose output.
            core::ptr::write_volatile(RCC_AHB1ENR, core::ptr::read_volatile(RCC_AHB1ENR) | (1 << 3));
            let mut moder = core::ptr::read_volatile(GPIOD_MODER);
            for &pin in pins {
                moder = (moder & !(0b11 << (pin * 2))) | (0b01 << (pin * 2));
            }
            core::ptr::write_volatile(GPIOD_MODER, moder);
        }
    }

    fn led_write(pin: u32, high: bool) {
        let bit = if high { 1 << pin } else { 1 << (pin + 16) };
        unsafe { core::ptr::write_volatile(GPIOD_BSRR, bit) }
    }

    // ----------------------------------------------------------------------
    // Tasks
    // ----------------------------------------------------------------------

    fn blink_forever(pin: u32) -> ! {
        loop {
            led_write(pin, true);
            let _ = kernel::sleep(400);
            led_write(pin, false);
            let _ = kernel::sleep(1000);
        }
    }

    extern "C" fn green_blinker() {
        blink_forever(LED_GREEN);
    }

    extern "C" fn orange_blinker() {
        blink_forever(LED_ORANGE);
    }

    /// Background task: nothing to do but demonstrate cooperative yielding.
    extern "C" fn heartbeat() {
        loop {
            let _ = kernel::yield_now();
        }
    }

    /// A dead task's LEDs stay dark; nothing else to do here without a
    /// serial console.
    fn on_fault(_task: TaskId, _kind: FaultKind) {}

    #[entry]
    fn main() -> ! {
        let cp = cortex_m::Peripherals::take().unwrap();

        gpio_init(&[LED_GREEN, LED_ORANGE]);

        kernel::init(PreemptPolicy::Cooperative);
        kernel::set_fault_hook(on_fault);

        kernel::spawn(green_blinker, 2).expect("spawn green_blinker");
        kernel::spawn(orange_blinker, 2).expect("spawn orange_blinker");
        kernel::spawn(heartbeat, 1).expect("spawn heartbeat");

        kernel::start(cp)
    }
}

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
fn main() {}
