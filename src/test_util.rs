/**
 * Floating point helpers shared by the unit tests.
 */
use num::{Float, NumCast};


/**
 * Asserts that two floating point values are within a tolerance of each other. The tolerance
 * defaults to 1e-9.
 */
macro_rules! assert_approx_eq {
    ($value_1:expr, $value_2:expr) => {
        assert_approx_eq!($value_1, $value_2, 1.0e-9)
    };
    ($value_1:expr, $value_2:expr, $tolerance:expr) => {{
        let (value_1, value_2) = ($value_1, $value_2);
        assert!(
            $crate::test_util::approx_eq(value_1, value_2, $tolerance),
            "{} != {} (tolerance {})",
            value_1,
            value_2,
            $tolerance);
    }};
}


pub fn approx_eq<T: Float>(value_1: T, value_2: T, tolerance: f64) -> bool {
    // Yeah, I know this is bad, see
    // http://randomascii.wordpress.com/2012/02/25/comparing-floating-point-numbers-2012-edition/
    let tolerance: T = match NumCast::from(tolerance) {
        Some(t) => t,
        None => return false,
    };
    (value_1 - value_2).abs() < tolerance
}
