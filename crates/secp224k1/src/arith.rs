//! Modular arithmetic helpers.

use num_bigint::BigInt;
use num_traits::{One, Zero};

/// Non-negative remainder of `n` modulo `m`, for any sign of `n`.
///
/// Rust's `%` follows the sign of the dividend; curve arithmetic needs the
/// canonical representative in `[0, m)`, hence the double reduction.
pub fn modulo(n: &BigInt, m: &BigInt) -> BigInt {
    ((n % m) + m) % m
}

/// Modular inverse of `a` modulo `n` via the extended Euclidean algorithm.
///
/// Returns `None` iff `gcd(a, n) != 1`. With a prime modulus and a nonzero
/// operand that cannot happen; callers treat `None` as a fatal algorithm
/// error, never as a validation failure.
pub fn mod_inverse(a: &BigInt, n: &BigInt) -> Option<BigInt> {
    let mut r = (modulo(a, n), n.clone());
    let mut t = (BigInt::one(), BigInt::zero());

    while !r.0.is_zero() {
        let q = &r.1 / &r.0;
        r = (&r.1 - &q * &r.0, r.0);
        t = (&t.1 - &q * &t.0, t.0);
    }

    if r.1.is_one() {
        Some(modulo(&t.1, n))
    } else {
        None
    }
}
