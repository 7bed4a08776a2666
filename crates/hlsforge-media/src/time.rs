//! Timescale conversion.
//!
//! Every timestamp that crosses a timescale boundary goes through [`rescale`],
//! which rounds to nearest by adding half of the source scale before the
//! integer division. Segment boundaries and playlist durations depend on this
//! exact rounding, so no other conversion is used anywhere in the crate.

/// Milliseconds timescale.
pub const MILLIS: u32 = 1000;

/// MPEG-TS 90 kHz clock.
pub const MPEG_CLOCK: u32 = 90_000;

/// Convert `time` from `from_scale` ticks per second to `to_scale`.
///
/// Returns `time` unchanged when `from_scale` is zero.
pub fn rescale(time: u64, from_scale: u32, to_scale: u32) -> u64 {
    if from_scale == 0 {
        return time;
    }
    let from = from_scale as u128;
    ((time as u128 * to_scale as u128 + from / 2) / from) as u64
}

/// Signed variant of [`rescale`] for composition offsets.
///
/// Uses floor division so negative offsets round the same way as positive
/// ones shifted by the half-divisor.
pub fn rescale_signed(time: i64, from_scale: u32, to_scale: u32) -> i64 {
    if from_scale == 0 {
        return time;
    }
    let from = from_scale as i128;
    (time as i128 * to_scale as i128 + from / 2).div_euclid(from) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescale_identity() {
        for scale in [1u32, 2, 3, 1000, 44_100, 90_000, 12_800] {
            for t in [0u64, 1, 7, 999, 1_000_000, u32::MAX as u64] {
                assert_eq!(rescale(t, scale, scale), t);
            }
        }
    }

    #[test]
    fn test_rescale_rounds_to_nearest() {
        // 1001 ticks at 30000 -> 33.366ms -> 33
        assert_eq!(rescale(1001, 30_000, 1000), 33);
        // 1024 ticks at 44100 -> 23.219ms -> 23
        assert_eq!(rescale(1024, 44_100, 1000), 23);
        // exact half rounds up
        assert_eq!(rescale(1, 2, 1), 1);
        assert_eq!(rescale(3, 2, 1), 2);
    }

    #[test]
    fn test_rescale_to_mpeg_clock() {
        assert_eq!(rescale(1000, 1000, MPEG_CLOCK), 90_000);
        assert_eq!(rescale(512, 12_800, MPEG_CLOCK), 3600);
    }

    #[test]
    fn test_rescale_zero_scale_passthrough() {
        assert_eq!(rescale(1234, 0, 1000), 1234);
        assert_eq!(rescale_signed(-5, 0, 1000), -5);
    }

    #[test]
    fn test_rescale_signed() {
        assert_eq!(rescale_signed(2002, 30_000, 1000), 67);
        assert_eq!(rescale_signed(-1001, 30_000, 1000), -33);
        assert_eq!(rescale_signed(0, 30_000, 1000), 0);
    }
}
