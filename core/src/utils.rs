//! Discrete distributions and special functions.

use std::{
    f64::consts::{PI, TAU},
    sync::OnceLock,
};

/// Returns the PMF of the binomial distribution with `n` trials and success probability `p`.
///
/// The probabilities of zero successes at `p = 0` and `n` successes at `p = 1` are exactly one.
pub fn binomial_pmf(n: u64, k: u64, p: f64) -> f64 {
    if k > n {
        return 0.0;
    }

    match p {
        p if p <= 0.0 => f64::from(u8::from(k == 0)),
        p if p >= 1.0 => f64::from(u8::from(k == n)),
        p => (ln_binomial(n, k) + k as f64 * p.ln() + (n - k) as f64 * (-p).ln_1p()).exp(),
    }
}

/// Returns the PMF of the hypergeometric distribution.
///
/// This is the probability of `observed` successes in `draws` draws without replacement from a
/// population of `size`, of which `successes` are successes.
pub fn hypergeometric_pmf(size: u64, successes: u64, draws: u64, observed: u64) -> f64 {
    if observed > draws || observed > successes || draws - observed > size - successes {
        return 0.0;
    }

    (ln_binomial(successes, observed) + ln_binomial(size - successes, draws - observed)
        - ln_binomial(size, draws))
    .exp()
}

fn ln_binomial(n: u64, k: u64) -> f64 {
    ln_factorial(n) - ln_factorial(k) - ln_factorial(n - k)
}

const LN_FACTORIAL_TABLE_LEN: usize = 256;

/// Returns the natural logarithm of `x!`.
pub fn ln_factorial(x: u64) -> f64 {
    static TABLE: OnceLock<Vec<f64>> = OnceLock::new();

    let table = TABLE.get_or_init(|| {
        let mut table = Vec::with_capacity(LN_FACTORIAL_TABLE_LEN);
        let mut acc = 0.0;
        table.push(acc);
        for i in 1..LN_FACTORIAL_TABLE_LEN {
            acc += (i as f64).ln();
            table.push(acc);
        }
        table
    });

    match table.get(x as usize) {
        Some(&v) => v,
        None => ln_gamma(x as f64 + 1.0),
    }
}

// Lanczos approximation with g = 7
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

/// Returns the natural logarithm of the absolute value of the gamma function.
pub fn ln_gamma(x: f64) -> f64 {
    if x < 0.5 {
        // Reflection formula
        return (PI / (PI * x).sin().abs()).ln() - ln_gamma(1.0 - x);
    }

    let x = x - 1.0;
    let (first, rest) = LANCZOS_COEFFICIENTS.split_at(1);
    let series = rest
        .iter()
        .enumerate()
        .fold(first[0], |acc, (i, c)| acc + c / (x + i as f64 + 1.0));
    let t = x + LANCZOS_G + 0.5;

    0.5 * TAU.ln() + (x + 0.5) * t.ln() - t + series.ln()
}
