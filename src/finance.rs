//! General functions related to finance and equipment ageing.

/// Calculates the capital recovery factor (CRF) for a given lifetime and discount rate.
///
/// The CRF is used to annualize capital costs over the lifetime of an asset.
pub fn capital_recovery_factor(lifetime: u32, discount_rate: f64) -> f64 {
    if lifetime == 0 {
        return 0.0;
    }
    if discount_rate == 0.0 {
        return 1.0 / lifetime as f64;
    }
    let factor = (1.0 + discount_rate).powi(lifetime as i32);
    (discount_rate * factor) / (factor - 1.0)
}

/// The present-value factor for a cash flow `periods` years in the future
pub fn discount_factor(discount_rate: f64, periods: u32) -> f64 {
    (1.0 + discount_rate).powi(-(periods as i32))
}

/// Multiplicative derating of a technology installed in `stage` when operated in `year`.
///
/// Derating applies only within the nominal lifetime window starting at the
/// installation stage; outside it the coefficient is one.
pub fn total_degradation(yearly_degradation: f64, lifetime: u32, stage: u32, year: u32) -> f64 {
    if year >= stage && year < stage + lifetime {
        (1.0 - yearly_degradation).powi((year - stage) as i32)
    } else {
        1.0
    }
}

/// The fraction of capital value recovered at the model horizon's end for
/// equipment installed in `stage` with useful life extending beyond the
/// horizon's final year.
///
/// The expression is not clamped: when the useful life ends within the
/// horizon (`stage + lifetime <= horizon_end`) the fraction turns negative.
/// Salvage variables are bounded at zero, so installing such short-lived
/// equipment renders the model infeasible rather than yielding a rebate.
pub fn salvage_fraction(horizon_end: u32, stage: u32, lifetime: u32, discount_rate: f64) -> f64 {
    let remaining = horizon_end as i32 + 1 - stage as i32 - lifetime as i32;
    1.0 - (1.0 + discount_rate).powi(remaining)
        / (1.0 - (1.0 + discount_rate).powi(-(lifetime as i32)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    #[case(0, 0.05, 0.0)] // Edge case: lifetime==0
    #[case(10, 0.0, 0.1)] // Other edge case: discount_rate==0
    #[case(10, 0.05, 0.1295045749654567)]
    #[case(5, 0.03, 0.2183545714005762)]
    fn test_capital_recovery_factor(
        #[case] lifetime: u32,
        #[case] discount_rate: f64,
        #[case] expected: f64,
    ) {
        let result = capital_recovery_factor(lifetime, discount_rate);
        assert_approx_eq!(f64, result, expected, epsilon = 1e-10);
    }

    #[rstest]
    #[case(0.05, 0, 1.0)]
    #[case(0.05, 1, 1.0 / 1.05)]
    #[case(0.1, 2, 1.0 / 1.21)]
    fn test_discount_factor(#[case] rate: f64, #[case] periods: u32, #[case] expected: f64) {
        assert_approx_eq!(f64, discount_factor(rate, periods), expected, epsilon = 1e-10);
    }

    #[rstest]
    #[case(1, 1, 1.0)] // Installation year, no ageing yet
    #[case(1, 3, 0.9025)] // Two years of ageing: 0.95^2
    #[case(3, 1, 1.0)] // Before installation
    #[case(1, 25, 1.0)] // Past nominal lifetime
    fn test_total_degradation(#[case] stage: u32, #[case] year: u32, #[case] expected: f64) {
        let result = total_degradation(0.05, 20, stage, year);
        assert_approx_eq!(f64, result, expected, epsilon = 1e-10);
    }

    #[test]
    fn test_salvage_fraction() {
        // 4-year horizon, installed in stage 3 with 20-year lifetime:
        // 1 - 1.05^(4+1-3-20) / (1 - 1.05^-20)
        let expected = 1.0 - 1.05_f64.powi(-18) / (1.0 - 1.05_f64.powi(-20));
        assert_approx_eq!(f64, salvage_fraction(4, 3, 20, 0.05), expected, epsilon = 1e-10);
    }

    #[test]
    fn test_salvage_fraction_negative_when_life_ends_within_horizon() {
        // Lifetime 2 installed in stage 1 on a 4-year horizon: the formula
        // is unclamped and the fraction turns negative
        let expected = 1.0 - 1.05_f64.powi(2) / (1.0 - 1.05_f64.powi(-2));
        let result = salvage_fraction(4, 1, 2, 0.05);
        assert!(result < 0.0);
        assert_approx_eq!(f64, result, expected, epsilon = 1e-10);
    }
}
