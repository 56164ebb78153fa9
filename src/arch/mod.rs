//! # Port Layer
//!
//! Hardware abstraction boundary for the scheduler. The Cortex-M4 port
//! (PendSV context switch, SysTick tick source) is compiled only for
//! bare-metal ARM targets; everywhere else a no-op stub stands in so the
//! scheduling logic can be unit tested on a development machine.

#[cfg(all(target_arch = "arm", target_os = "none"))]
pub mod cortex_m4;
#[cfg(all(target_arch = "arm", target_os = "none"))]
pub use cortex_m4 as port;

#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub mod host;
#[cfg(not(all(target_arch = "arm", target_os = "none")))]
pub use host as port;
