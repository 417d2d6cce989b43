//! Numerical helpers for the baseline estimate.
use std::f64::consts::PI;

const LANCZOS_G: f64 = 7.0;
const LANCZOS_COEFFICIENTS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

const BETA_CF_MAX_ITERATIONS: usize = 300;
const BETA_CF_EPSILON: f64 = 1e-15;
const BETA_CF_TINY: f64 = 1e-300;

/// Sample mean and variance of a sequence of values.
///
/// Uses the single pass update of Welford, with an `n - 1` denominator for the variance.
/// Only the first `sample_cutoff` values are used. Returns NaN for both when no values are
/// used, and a variance of zero for a single value.
pub fn mean_and_variance(data: &[i16], sample_cutoff: usize) -> (f64, f64) {
    let n_used = data.len().min(sample_cutoff);
    if n_used == 0 {
        return (f64::NAN, f64::NAN);
    } else if n_used == 1 {
        return (data[0] as f64, 0.0);
    }

    let mut mean = 0.0;
    let mut sum_sq = 0.0;
    for (idx, value) in data[..n_used].iter().enumerate() {
        let x = *value as f64;
        let delta = x - mean;
        mean += delta / (idx + 1) as f64;
        sum_sq += delta * (x - mean);
    }

    (mean, sum_sq / (n_used - 1) as f64)
}

/// Natural log of the gamma function for positive arguments (Lanczos approximation)
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula
        (PI / (PI * x).sin()).ln() - ln_gamma(1.0 - x)
    } else {
        let x = x - 1.0;
        let t = x + LANCZOS_G + 0.5;
        let series = LANCZOS_COEFFICIENTS
            .iter()
            .enumerate()
            .skip(1)
            .fold(LANCZOS_COEFFICIENTS[0], |acc, (i, c)| acc + c / (x + i as f64));
        0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + series.ln()
    }
}

/// Continued fraction for the incomplete beta function (modified Lentz)
fn beta_continued_fraction(x: f64, a: f64, b: f64) -> f64 {
    let clamp = |v: f64| if v.abs() < BETA_CF_TINY { BETA_CF_TINY } else { v };

    let qab = a + b;
    let qap = a + 1.0;
    let qam = a - 1.0;
    let mut c = 1.0;
    let mut d = 1.0 / clamp(1.0 - qab * x / qap);
    let mut h = d;

    for m in 1..=BETA_CF_MAX_ITERATIONS {
        let m = m as f64;
        let m2 = 2.0 * m;

        // Even step
        let aa = m * (b - m) * x / ((qam + m2) * (a + m2));
        d = 1.0 / clamp(1.0 + aa * d);
        c = clamp(1.0 + aa / c);
        h *= d * c;

        // Odd step
        let aa = -(a + m) * (qab + m) * x / ((a + m2) * (qap + m2));
        d = 1.0 / clamp(1.0 + aa * d);
        c = clamp(1.0 + aa / c);
        let delta = d * c;
        h *= delta;

        if (delta - 1.0).abs() < BETA_CF_EPSILON {
            break;
        }
    }
    h
}

/// The regularized incomplete beta function I_x(a, b)
pub fn regularized_incomplete_beta(x: f64, a: f64, b: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    } else if x <= 0.0 {
        return 0.0;
    } else if x >= 1.0 {
        return 1.0;
    }

    let ln_front = ln_gamma(a + b) - ln_gamma(a) - ln_gamma(b) + a * x.ln() + b * (1.0 - x).ln();
    let front = ln_front.exp();

    // The continued fraction converges fastest on this side of the mean
    if x < (a + 1.0) / (a + b + 2.0) {
        front * beta_continued_fraction(x, a, b) / a
    } else {
        1.0 - front * beta_continued_fraction(1.0 - x, b, a) / b
    }
}

/// Two-tailed probability that two sample variances come from the same distribution.
///
/// Both samples have `dof` degrees of freedom. Zero against zero is treated as an exact
/// match; NaN variances propagate.
pub fn f_test_probability(var_a: f64, var_b: f64, dof: f64) -> f64 {
    if var_a.is_nan() || var_b.is_nan() {
        return f64::NAN;
    }
    let (larger, smaller) = if var_a > var_b {
        (var_a, var_b)
    } else {
        (var_b, var_a)
    };
    let f = if larger == 0.0 { 1.0 } else { larger / smaller };

    let nu = dof / 2.0;
    (2.0 * regularized_incomplete_beta(1.0 / (1.0 + f), nu, nu)).min(1.0)
}
