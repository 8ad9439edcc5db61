//! Interrupt handling
//!
//! SIGINT and SIGTERM request cancellation instead of killing the harness,
//! so the configuration in flight completes and a partial report is still
//! written. A second signal restores nothing; the sweep simply stops at the
//! next configuration boundary.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use sweepbench_core::CancellationToken;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Whether an interrupt signal has been received
pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::Relaxed)
}

#[cfg(unix)]
extern "C" fn interrupt_handler(_sig: libc::c_int) {
    INTERRUPTED.store(true, Ordering::Relaxed);
}

/// Install handlers that only set an atomic flag (async-signal-safe).
#[cfg(unix)]
fn install_handlers() {
    unsafe {
        let mut sa: libc::sigaction = std::mem::zeroed();
        sa.sa_sigaction = interrupt_handler as *const () as usize;
        sa.sa_flags = libc::SA_RESTART;
        libc::sigemptyset(&mut sa.sa_mask);
        libc::sigaction(libc::SIGINT, &sa, std::ptr::null_mut());
        libc::sigaction(libc::SIGTERM, &sa, std::ptr::null_mut());
    }
}

#[cfg(not(unix))]
fn install_handlers() {}

/// Cancel `token` once an interrupt arrives
pub fn cancel_on_interrupt(token: &CancellationToken) {
    install_handlers();
    let token = token.clone();
    std::thread::spawn(move || {
        while !interrupted() {
            std::thread::sleep(Duration::from_millis(50));
        }
        tracing::warn!("interrupt received, stopping after the current configuration");
        token.cancel();
    });
}
