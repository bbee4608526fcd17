//! Batch Timing
//!
//! One timer read per batch: wall-clock nanoseconds from `std::time::Instant`
//! plus a hardware tick count (RDTSCP on x86_64, CNTVCT_EL0 on AArch64) where
//! the platform has one.

use std::time::Instant;

#[cfg(target_arch = "x86_64")]
#[inline(always)]
fn read_cycles() -> u64 {
    let mut aux = 0u32;
    // SAFETY: RDTSCP exists on every x86_64 CPU this crate targets and only
    // writes the processor id into `aux`.
    unsafe { std::arch::x86_64::__rdtscp(&mut aux) }
}

#[cfg(target_arch = "aarch64")]
#[inline(always)]
fn read_cycles() -> u64 {
    let ticks: u64;
    // SAFETY: CNTVCT_EL0 is readable from user space on AArch64.
    unsafe {
        std::arch::asm!("mrs {}, cntvct_el0", out(reg) ticks, options(nostack, nomem));
    }
    ticks
}

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
#[inline(always)]
fn read_cycles() -> u64 {
    0
}

/// Whether cycle counts are real; when `false` every `cycles` value is 0.
pub const HAS_CYCLE_COUNTER: bool = cfg!(any(target_arch = "x86_64", target_arch = "aarch64"));

/// Elapsed wall time and ticks of one timed batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchTiming {
    /// Wall-clock nanoseconds
    pub nanos: u64,
    /// Cycle counter ticks (0 without a counter)
    pub cycles: u64,
}

/// Started around a batch of iterations, stopped once after it
#[derive(Debug, Clone, Copy)]
pub struct BatchTimer {
    wall: Instant,
    cycles: u64,
}

impl BatchTimer {
    /// Read both clocks
    #[inline(always)]
    pub fn start() -> Self {
        let cycles = read_cycles();
        Self {
            wall: Instant::now(),
            cycles,
        }
    }

    /// Time since [`BatchTimer::start`]
    #[inline(always)]
    pub fn stop(&self) -> BatchTiming {
        let nanos = self.wall.elapsed().as_nanos() as u64;
        BatchTiming {
            nanos,
            cycles: read_cycles().saturating_sub(self.cycles),
        }
    }
}

/// Pin the calling thread to one CPU.
///
/// Execution units call this first thing, so a unit neither migrates
/// mid-measurement nor mixes tick counts from two cores.
#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<(), std::io::Error> {
    let max = 8 * std::mem::size_of::<libc::cpu_set_t>();
    if cpu >= max {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("cpu {} is outside the affinity mask (max {})", cpu, max - 1),
        ));
    }

    // SAFETY: an all-zero cpu_set_t is the empty set; the set lives on this
    // frame for the duration of the call and pid 0 is the calling thread.
    let rc = unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_SET(cpu, &mut set);
        libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set)
    };

    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

/// No affinity control here; always succeeds.
#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<(), std::io::Error> {
    Ok(())
}
