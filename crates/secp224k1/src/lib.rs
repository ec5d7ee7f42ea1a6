//! # meterproof-secp224k1
//!
//! Exact modular arithmetic, affine short-Weierstrass point operations and
//! ECDSA over [`num_bigint::BigInt`], for curves the mainstream Rust curve
//! crates do not ship — primarily SEC2 secp224k1, the 224-bit Koblitz
//! curve some energy meters sign with.
//!
//! The arithmetic is deliberately the textbook affine kind: readings are
//! verified offline against public data, so interoperability with already
//! deployed signers matters and constant-time execution does not. Every
//! operation is arbitrary-precision and nothing truncates silently.

pub mod arith;
pub mod curve;
pub mod ecdsa;

pub use arith::{mod_inverse, modulo};
pub use curve::{secp224k1, Curve, CurveError, Point};
pub use ecdsa::{decode_sec1, sign, verify, Signature};
