// Direction consensus for one side.
//
// Every controller on a side reports a raw signed input; the field receives a
// single ternary signal per side: the sign of the mean. A lone dissenter
// among several teammates cannot flip the paddle on their own, and a tie
// stops it.

/// Sign of `value` as -1, 0 or 1. NaN maps to 0.
pub fn normalize(value: f64) -> i8 {
    if value > 0.0 {
        1
    } else if value < 0.0 {
        -1
    } else {
        0
    }
}

/// Normalized mean of `directions`. An empty side has no opinion and yields 0.
pub fn consensus<I>(directions: I) -> i8
where
    I: IntoIterator<Item = f64>,
{
    let (sum, count) = directions
        .into_iter()
        .fold((0.0_f64, 0_u32), |(sum, count), d| (sum + d, count + 1));
    if count == 0 {
        return 0;
    }
    normalize(sum / f64::from(count))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn majority_wins() {
        assert_eq!(consensus([1.0, 1.0, -1.0]), 1);
        assert_eq!(consensus([-1.0, -1.0, 1.0]), -1);
    }

    #[test]
    fn tie_stops_the_paddle() {
        assert_eq!(consensus([1.0, -1.0]), 0);
        assert_eq!(consensus([0.0, 0.0, 0.0]), 0);
    }

    #[test]
    fn single_controller_passes_through() {
        assert_eq!(consensus([-1.0]), -1);
        assert_eq!(consensus([1.0]), 1);
    }

    #[test]
    fn raw_magnitudes_are_averaged_before_the_sign() {
        // Mean is (3 - 1 - 1) / 3 > 0 even though most inputs are negative.
        assert_eq!(consensus([3.0, -1.0, -1.0]), 1);
        assert_eq!(consensus([0.25, -0.5]), -1);
    }

    #[test]
    fn empty_side_is_neutral() {
        assert_eq!(consensus(std::iter::empty()), 0);
    }

    #[test]
    fn normalize_handles_nan() {
        assert_eq!(normalize(f64::NAN), 0);
        assert_eq!(normalize(f64::INFINITY), 1);
        assert_eq!(normalize(-0.0), 0);
    }
}
