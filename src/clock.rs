//! Baseband clock arithmetic
//!
//! The baseband clock is a free running 32-bit counter which wraps around. Due times are compared
//! using the signed difference of two values, so any two compared values must be less than half of
//! the counter range apart.

/// Baseband clock value
pub type Ticks = u32;

/// Baseband clock frequency
pub const BB_CLK_RATE_HZ: u32 = 1_000_000;

/// Signed distance from `b` to `a`
pub fn ticks_diff(a: Ticks, b: Ticks) -> i32 {
    a.wrapping_sub(b) as i32
}

/// Checks if `a` is before `b`, taking the counter wraparound into account
///
/// # Examples
///
/// ```
/// use bb_sched::clock::is_before;
///
/// assert!(is_before(10, 20));
/// assert!(!is_before(20, 20));
/// assert!(is_before(0xffff_fff0, 0x0000_0010));
/// ```
pub fn is_before(a: Ticks, b: Ticks) -> bool {
    ticks_diff(a, b) < 0
}

/// Checks if `a` is after `b`, taking the counter wraparound into account
pub fn is_after(a: Ticks, b: Ticks) -> bool {
    ticks_diff(a, b) > 0
}

/// Returns the later of the two values
pub fn later(a: Ticks, b: Ticks) -> Ticks {
    if is_before(a, b) {
        b
    } else {
        a
    }
}

/// Converts microseconds to baseband clock ticks
pub fn us_to_ticks(us: u32) -> Ticks {
    ((us as u64 * BB_CLK_RATE_HZ as u64) / 1_000_000) as Ticks
}

/// Converts baseband clock ticks to microseconds
pub fn ticks_to_us(ticks: Ticks) -> u32 {
    ((ticks as u64 * 1_000_000) / BB_CLK_RATE_HZ as u64) as u32
}

/// Checks if windows `[a, a + a_len)` and `[b, b + b_len)` overlap
///
/// An empty window occupies its start tick, so a zero-length BOD cannot start inside another
/// window.
///
/// # Examples
///
/// ```
/// use bb_sched::clock::windows_overlap;
///
/// assert!(windows_overlap(100, 50, 120, 50));
/// assert!(!windows_overlap(100, 50, 150, 50));
/// assert!(windows_overlap(0xffff_fff0, 0x20, 0x0000_0008, 4));
/// assert!(windows_overlap(100, 50, 120, 0));
/// ```
pub fn windows_overlap(a: Ticks, a_len: Ticks, b: Ticks, b_len: Ticks) -> bool {
    let a_len = a_len.max(1);
    let b_len = b_len.max(1);

    is_before(a, b.wrapping_add(b_len)) && is_before(b, a.wrapping_add(a_len))
}
