// Unit conversions between display values and stepper steps
// Speed arrives as RPS x 10 in a single byte, positions are counted in microsteps.

/// Decode the display's speed byte (tenths of a revolution per second)
pub fn speed_byte_to_rps(raw: u8) -> f32 {
    f32::from(raw) / 10.0
}

/// Convert revolutions per second to whole steps per second
///
/// The fractional part is dropped (truncation toward zero), the same as the
/// integer conversion the display firmware relied on. Out-of-range values
/// saturate at the `i32` bounds.
pub fn rps_to_steps_per_second(rps: f32, steps_per_rev: u32) -> i32 {
    (rps * steps_per_rev as f32) as i32
}

/// Number of steps covered by `turns` full revolutions
pub fn turns_to_steps(turns: u8, steps_per_rev: u32) -> i64 {
    i64::from(turns) * i64::from(steps_per_rev)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STEPS_PER_REV: u32 = 3200;

    #[test]
    fn test_speed_byte_is_tenths() {
        for raw in 0..=u8::MAX {
            assert_eq!(speed_byte_to_rps(raw), raw as f32 / 10.0);
        }
        assert_eq!(speed_byte_to_rps(36), 3.6);
        assert_eq!(speed_byte_to_rps(255), 25.5);
    }

    #[test]
    fn test_rps_to_steps() {
        assert_eq!(rps_to_steps_per_second(1.0, STEPS_PER_REV), 3200);
        assert_eq!(rps_to_steps_per_second(0.5, STEPS_PER_REV), 1600);
        assert_eq!(rps_to_steps_per_second(3.6, STEPS_PER_REV), 11520);
        assert_eq!(rps_to_steps_per_second(0.0, STEPS_PER_REV), 0);
    }

    #[test]
    fn test_rps_to_steps_truncates() {
        // 0.1 RPS at 1/1 stepping: 0.1 * 15 = 1.5 steps/s
        assert_eq!(rps_to_steps_per_second(0.1, 15), 1);
    }

    #[test]
    fn test_rps_above_speed_cap_is_not_clamped_here() {
        // Clamping to the max speed happens in the stepping engine
        assert_eq!(rps_to_steps_per_second(25.5, STEPS_PER_REV), 81600);
    }

    #[test]
    fn test_turns_to_steps() {
        assert_eq!(turns_to_steps(0, STEPS_PER_REV), 0);
        assert_eq!(turns_to_steps(2, STEPS_PER_REV), 6400);
        assert_eq!(turns_to_steps(255, STEPS_PER_REV), 816_000);
    }
}
