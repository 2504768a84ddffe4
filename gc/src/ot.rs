//! Bellare–Micali 1-out-of-2 oblivious transfer (Naor–Pinkas variant), run
//! over a [`PrimeGroup`] and a [`Transport`].
//!
//! The Garbler holds two equal-length messages `(m0, m1)`; the Evaluator
//! holds a choice bit `beta`. After the exchange the Evaluator learns
//! exactly `m_beta`; the Garbler learns nothing about `beta`, and the
//! Evaluator cannot construct a pair of group elements for which it knows
//! both discrete logs (only the one corresponding to its own chosen
//! exponent). This mirrors Nigel Smart's "Cryptography Made Simple"
//! protocol, as used by the source implementation's `ot.py`.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::Shake256;
use tracing::debug;

use crate::error::Result;
use crate::prime_group::PrimeGroup;
use crate::transport::Transport;

/// The Garbler's second OT message: a fresh public key `c1` and the two
/// masked messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SecondMessage {
    c1: u64,
    e0: Vec<u8>,
    e1: Vec<u8>,
}

/// Squeezes `len` pseudo-random bytes out of SHAKE-256 fed with the
/// big-endian minimal byte encoding of `x`, used as the one-time mask for
/// each candidate message.
fn ot_hash(x: u64, len: usize) -> Vec<u8> {
    let bytes = x.to_be_bytes();
    let first_nonzero = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len() - 1);
    let mut hasher = Shake256::default();
    hasher.update(&bytes[first_nonzero..]);
    let mut reader = hasher.finalize_xof();
    let mut out = vec![0u8; len];
    reader.read(&mut out);
    out
}

fn xor_bytes(a: &[u8], b: &[u8]) -> Vec<u8> {
    a.iter().zip(b).map(|(x, y)| x ^ y).collect()
}

/// The Garbler's side of one OT instance: offers `msgs.0`/`msgs.1` and
/// learns nothing about which one the Evaluator eventually reads.
pub fn garbler_side<X: Transport, R: RngCore>(
    transport: &mut X,
    rng: &mut R,
    msgs: (&[u8], &[u8]),
) -> Result<()> {
    debug!("OT protocol started (garbler)");
    let group = PrimeGroup::generate(rng)?;
    let _ack: bool = transport.send_wait(&group)?;

    let r = group.rand_exponent(rng);
    let c = group.gen_pow(r);
    let h0: u64 = transport.send_wait(&c)?;
    let h1 = group.mul(c, group.inv(h0));

    let k = group.rand_exponent(rng);
    let c1 = group.gen_pow(k);
    let e0 = xor_bytes(msgs.0, &ot_hash(group.pow(h0, k), msgs.0.len()));
    let e1 = xor_bytes(msgs.1, &ot_hash(group.pow(h1, k), msgs.1.len()));

    transport.send(&SecondMessage { c1, e0, e1 })?;
    debug!("OT protocol ended (garbler)");
    Ok(())
}

/// The Evaluator's side of one OT instance: recovers `m_beta` without
/// revealing `beta` and without learning `m_{1-beta}`.
pub fn evaluator_side<X: Transport, R: RngCore>(
    transport: &mut X,
    rng: &mut R,
    beta: bool,
) -> Result<Vec<u8>> {
    debug!("OT protocol started (evaluator)");
    let group: PrimeGroup = transport.receive()?;
    group.validate()?;
    transport.send(&true)?;

    let c: u64 = transport.receive()?;
    let x = group.rand_exponent(rng);
    let x_pow = group.gen_pow(x);
    let h_other = group.mul(c, group.inv(x_pow));
    // h0 is whichever of (x_pow, h_other) plays the Garbler's "h0" role.
    let h0_to_send = if beta { h_other } else { x_pow };

    let reply: SecondMessage = transport.send_wait(&h0_to_send)?;
    let e_beta = if beta { &reply.e1 } else { &reply.e0 };
    let mask = ot_hash(group.pow(reply.c1, x), e_beta.len());
    let mb = xor_bytes(e_beta, &mask);

    debug!("OT protocol ended (evaluator)");
    Ok(mb)
}
