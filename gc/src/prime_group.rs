//! A prime-order cyclic subgroup of `(Z/pZ)*`, the algebraic setting the
//! oblivious transfer protocol runs in.
//!
//! `p` is a 64-bit prime and `g` generates the whole multiplicative group
//! `(Z/pZ)*` of order `p - 1`. Arithmetic is done with `u128`
//! intermediates to avoid overflow without pulling in an arbitrary-
//! precision integer crate.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{GcError, Result};

const PRIME_BITS: u32 = 64;
const MAX_PRIME_ATTEMPTS: u32 = 10_000;
const MAX_GENERATOR_ATTEMPTS: u32 = 10_000;

/// A prime `p` together with a generator `g` of `(Z/pZ)*`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimeGroup {
    /// The group's modulus.
    pub prime: u64,
    /// A generator of the full multiplicative group.
    pub generator: u64,
}

impl PrimeGroup {
    /// Generates a fresh random prime and a generator for it. Used once
    /// per oblivious-transfer session.
    pub fn generate<R: RngCore>(rng: &mut R) -> Result<Self> {
        let prime = gen_prime(rng)?;
        let generator = find_generator(rng, prime)?;
        Ok(PrimeGroup { prime, generator })
    }

    /// `a * b mod p`.
    pub fn mul(&self, a: u64, b: u64) -> u64 {
        ((a as u128 * b as u128) % self.prime as u128) as u64
    }

    /// `base^exp mod p`.
    pub fn pow(&self, base: u64, exp: u64) -> u64 {
        modpow(base, exp, self.prime)
    }

    /// `g^exp mod p`, where `g` is this group's generator.
    pub fn gen_pow(&self, exp: u64) -> u64 {
        self.pow(self.generator, exp)
    }

    /// The multiplicative inverse of `a` modulo `p`, via Fermat's little
    /// theorem (`a^(p-2) mod p`), valid since `p` is prime and `a != 0`.
    pub fn inv(&self, a: u64) -> u64 {
        modpow(a, self.prime - 2, self.prime)
    }

    /// A uniformly random exponent in `[1, p - 2]`, suitable as a private
    /// OT scalar.
    pub fn rand_exponent<R: RngCore>(&self, rng: &mut R) -> u64 {
        let span = self.prime - 2;
        1 + (rng.next_u64() % span)
    }

    /// Rejects a group received from a peer if its modulus is too small to
    /// be meaningful or its generator is the zero or unit element — the
    /// two cases spec.md §4.1 calls out as `CryptoParamError`.
    pub fn validate(&self) -> Result<()> {
        if self.prime <= 2 || self.generator == 0 || self.generator == 1 {
            return Err(GcError::CryptoParam(
                "group element must not be zero or the identity".to_string(),
            ));
        }
        Ok(())
    }
}

fn modpow(mut base: u64, mut exp: u64, modulus: u64) -> u64 {
    if modulus == 1 {
        return 0;
    }
    let mut result: u128 = 1;
    let m = modulus as u128;
    base %= modulus;
    let mut b = base as u128;
    while exp > 0 {
        if exp & 1 == 1 {
            result = (result * b) % m;
        }
        b = (b * b) % m;
        exp >>= 1;
    }
    result as u64
}

fn gen_prime<R: RngCore>(rng: &mut R) -> Result<u64> {
    let high_bit = 1u64 << (PRIME_BITS - 1);
    for _ in 0..MAX_PRIME_ATTEMPTS {
        let candidate = (rng.next_u64() | high_bit) | 1;
        if is_prime(candidate) {
            return Ok(candidate);
        }
    }
    Err(GcError::PrimalityExhausted)
}

/// Deterministic Miller-Rabin, correct for all 64-bit integers using the
/// witness set `{2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37}`.
fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for small in [2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        if n == small {
            return true;
        }
        if n % small == 0 {
            return false;
        }
    }

    let mut d = n - 1;
    let mut r = 0u32;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }

    'witness: for &a in &[2u64, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37] {
        let mut x = modpow(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 0..r - 1 {
            x = modpow(x, 2, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Finds the prime factors of `n` via trial division for small factors
/// and Pollard's rho for whatever large factor remains.
fn prime_factors(mut n: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    for small in 2u64..1_000_000 {
        if small * small > n {
            break;
        }
        if n % small == 0 {
            factors.push(small);
            while n % small == 0 {
                n /= small;
            }
        }
    }
    if n > 1 {
        factor_recursive(n, &mut factors);
    }
    factors
}

fn factor_recursive(n: u64, out: &mut Vec<u64>) {
    if n == 1 {
        return;
    }
    if is_prime(n) {
        out.push(n);
        return;
    }
    let d = pollard_rho(n);
    factor_recursive(d, out);
    factor_recursive(n / d, out);
}

fn pollard_rho(n: u64) -> u64 {
    if n % 2 == 0 {
        return 2;
    }
    let mut x: u64 = 2;
    let mut y: u64 = 2;
    let mut d: u64 = 1;
    let f = |v: u64| -> u64 { (modpow(v, 2, n) + 1) % n };
    while d == 1 {
        x = f(x);
        y = f(f(y));
        let diff = if x > y { x - y } else { y - x };
        d = gcd(diff, n);
    }
    if d == n { n } else { d }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

fn find_generator<R: RngCore>(rng: &mut R, prime: u64) -> Result<u64> {
    let order = prime - 1;
    let factors = prime_factors(order);
    for _ in 0..MAX_GENERATOR_ATTEMPTS {
        let candidate = 2 + (rng.next_u64() % (prime - 3));
        let is_generator = factors
            .iter()
            .all(|&q| modpow(candidate, order / q, prime) != 1);
        if is_generator {
            return Ok(candidate);
        }
    }
    Err(GcError::PrimalityExhausted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_chacha::ChaCha12Rng;
    use rand::SeedableRng;

    #[test]
    fn is_prime_matches_known_values() {
        assert!(is_prime(2));
        assert!(is_prime(3));
        assert!(is_prime(97));
        assert!(!is_prime(1));
        assert!(!is_prime(0));
        assert!(!is_prime(100));
        assert!(is_prime(18_446_744_073_709_551_557)); // largest 64-bit prime
    }

    #[test]
    fn modpow_matches_brute_force() {
        for base in 2u64..10 {
            for exp in 0u64..6 {
                let expected: u64 = (0..exp).fold(1u64, |acc, _| (acc * base) % 101);
                assert_eq!(modpow(base, exp, 101), expected);
            }
        }
    }

    #[test]
    fn inverse_round_trips() {
        let group = PrimeGroup { prime: 101, generator: 2 };
        for a in 1u64..101 {
            let inv = group.inv(a);
            assert_eq!(group.mul(a, inv), 1);
        }
    }

    #[test]
    fn rejects_degenerate_group_elements() {
        assert!(PrimeGroup { prime: 11, generator: 1 }.validate().is_err());
        assert!(PrimeGroup { prime: 11, generator: 0 }.validate().is_err());
        assert!(PrimeGroup { prime: 2, generator: 1 }.validate().is_err());
    }

    #[test]
    fn generate_produces_a_prime_with_a_generator() {
        let mut rng = ChaCha12Rng::from_seed([11u8; 32]);
        let group = PrimeGroup::generate(&mut rng).unwrap();
        assert!(is_prime(group.prime));
        assert_eq!(group.gen_pow(group.prime - 1), 1);
    }

    #[test]
    fn deterministic_under_fixed_seed() {
        let mut rng_a = ChaCha12Rng::from_seed([21u8; 32]);
        let mut rng_b = ChaCha12Rng::from_seed([21u8; 32]);
        let a = PrimeGroup::generate(&mut rng_a).unwrap();
        let b = PrimeGroup::generate(&mut rng_b).unwrap();
        assert_eq!(a, b);
    }
}
