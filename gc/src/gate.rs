//! Construction and point-and-permute evaluation of a single garbled
//! gate's table.

use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

use crate::cipher::{self, Key};
use crate::circuit::GateType;
use crate::error::{GcError, Result};

/// The permutation bit assigned to a wire: which of its two keys is
/// "labeled 0" from an outside observer's point of view is randomized
/// per wire by this bit.
pub type PBit = bool;

/// The two keys associated with a wire, indexed by the wire's plaintext
/// bit value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KeyPair {
    key0: Key,
    key1: Key,
}

impl KeyPair {
    /// Draws a fresh, independent pair of random keys.
    pub fn random(rng: &mut ChaCha12Rng) -> Self {
        use rand::RngCore;
        let mut key0 = [0u8; cipher::KEY_LEN];
        let mut key1 = [0u8; cipher::KEY_LEN];
        rng.fill_bytes(&mut key0);
        rng.fill_bytes(&mut key1);
        KeyPair { key0, key1 }
    }

    /// The key corresponding to plaintext bit `bit`.
    pub fn key_for(&self, bit: bool) -> &Key {
        if bit { &self.key1 } else { &self.key0 }
    }
}

/// One ciphertext entry in a garbled table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarbledRow(pub Vec<u8>);

/// The garbled table for a single gate: one row per combination of the
/// permuted input bits, indexed directly (point-and-permute), never by
/// trial decryption.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarbledTable {
    rows: Vec<GarbledRow>,
}

#[derive(Serialize, Deserialize)]
struct RowPayload {
    key_out: Key,
    encr_bit_out: bool,
}

impl GarbledTable {
    fn row_index(encr_bits: &[bool]) -> usize {
        encr_bits.iter().fold(0usize, |acc, &b| (acc << 1) | (b as usize))
    }

    /// The raw rows, in point-and-permute index order. Exposed only for
    /// the `-m table` debug print, which shows ciphertext bytes without
    /// ever decrypting them.
    pub fn rows(&self) -> &[GarbledRow] {
        &self.rows
    }

    /// Builds the garbled table for a `Not` gate.
    pub fn garble_not(
        rng: &mut ChaCha12Rng,
        in_pair: &KeyPair,
        in_pbit: PBit,
        out_pair: &KeyPair,
        out_pbit: PBit,
    ) -> Result<Self> {
        let mut rows = vec![GarbledRow(Vec::new()); 2];
        for encr_bit_in in [false, true] {
            let bit_in = encr_bit_in ^ in_pbit;
            let bit_out = !bit_in;
            let encr_bit_out = bit_out ^ out_pbit;
            let key_in = in_pair.key_for(bit_in);
            let key_out = out_pair.key_for(bit_out);
            let payload = bincode::serde::encode_to_vec(
                RowPayload { key_out: *key_out, encr_bit_out },
                bincode::config::standard(),
            )
            .map_err(|e| GcError::CryptoParam(format!("payload encoding failed: {e}")))?;
            let ciphertext = cipher::encrypt(rng, key_in, &payload)?;
            rows[Self::row_index(&[encr_bit_in])] = GarbledRow(ciphertext);
        }
        Ok(GarbledTable { rows })
    }

    /// Builds the garbled table for a two-input gate. Encryption order is
    /// `encrypt(key_a, encrypt(key_b, payload))`: the outer layer peeled
    /// off first during evaluation is always `key_a`.
    pub fn garble_binary(
        rng: &mut ChaCha12Rng,
        gate_type: GateType,
        a_pair: &KeyPair,
        a_pbit: PBit,
        b_pair: &KeyPair,
        b_pbit: PBit,
        out_pair: &KeyPair,
        out_pbit: PBit,
    ) -> Result<Self> {
        let mut rows = vec![GarbledRow(Vec::new()); 4];
        for encr_bit_a in [false, true] {
            for encr_bit_b in [false, true] {
                let bit_a = encr_bit_a ^ a_pbit;
                let bit_b = encr_bit_b ^ b_pbit;
                let bit_out = gate_type.apply(bit_a, bit_b);
                let encr_bit_out = bit_out ^ out_pbit;
                let key_a = a_pair.key_for(bit_a);
                let key_b = b_pair.key_for(bit_b);
                let key_out = out_pair.key_for(bit_out);
                let payload = bincode::serde::encode_to_vec(
                    RowPayload { key_out: *key_out, encr_bit_out },
                    bincode::config::standard(),
                )
                .map_err(|e| GcError::CryptoParam(format!("payload encoding failed: {e}")))?;
                let inner = cipher::encrypt(rng, key_b, &payload)?;
                let outer = cipher::encrypt(rng, key_a, &inner)?;
                rows[Self::row_index(&[encr_bit_a, encr_bit_b])] = GarbledRow(outer);
            }
        }
        Ok(GarbledTable { rows })
    }

    /// Evaluates a `Not` gate's row for the given encrypted input bit and
    /// key, returning the output key and its encrypted bit.
    pub fn evaluate_not(&self, gate_id: u32, encr_bit_in: bool, key_in: &Key) -> Result<(Key, bool)> {
        let row = &self.rows[Self::row_index(&[encr_bit_in])];
        let plain = cipher::decrypt(key_in, &row.0).map_err(|_| GcError::DecryptFailure { gate_id })?;
        let payload: RowPayload = bincode::serde::decode_from_slice(&plain, bincode::config::standard())
            .map_err(|_| GcError::DecryptFailure { gate_id })?
            .0;
        Ok((payload.key_out, payload.encr_bit_out))
    }

    /// Evaluates a two-input gate's row, peeling `key_a` first, then
    /// `key_b`.
    pub fn evaluate_binary(
        &self,
        gate_id: u32,
        encr_bit_a: bool,
        encr_bit_b: bool,
        key_a: &Key,
        key_b: &Key,
    ) -> Result<(Key, bool)> {
        let row = &self.rows[Self::row_index(&[encr_bit_a, encr_bit_b])];
        let outer = cipher::decrypt(key_a, &row.0).map_err(|_| GcError::DecryptFailure { gate_id })?;
        let inner = cipher::decrypt(key_b, &outer).map_err(|_| GcError::DecryptFailure { gate_id })?;
        let payload: RowPayload = bincode::serde::decode_from_slice(&inner, bincode::config::standard())
            .map_err(|_| GcError::DecryptFailure { gate_id })?
            .0;
        Ok((payload.key_out, payload.encr_bit_out))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> ChaCha12Rng {
        ChaCha12Rng::from_seed([5u8; 32])
    }

    #[test]
    fn not_gate_round_trips_for_both_bits() {
        let mut r = rng();
        let in_pair = KeyPair::random(&mut r);
        let out_pair = KeyPair::random(&mut r);
        let in_pbit = true;
        let out_pbit = false;
        let table = GarbledTable::garble_not(&mut r, &in_pair, in_pbit, &out_pair, out_pbit).unwrap();

        for bit_in in [false, true] {
            let encr_bit_in = bit_in ^ in_pbit;
            let key_in = in_pair.key_for(bit_in);
            let (key_out, encr_bit_out) = table.evaluate_not(0, encr_bit_in, key_in).unwrap();
            let bit_out = encr_bit_out ^ out_pbit;
            assert_eq!(bit_out, !bit_in);
            assert_eq!(&key_out, out_pair.key_for(bit_out));
        }
    }

    #[test]
    fn and_gate_round_trips_for_all_input_combinations() {
        let mut r = rng();
        let a_pair = KeyPair::random(&mut r);
        let b_pair = KeyPair::random(&mut r);
        let out_pair = KeyPair::random(&mut r);
        let (a_pbit, b_pbit, out_pbit) = (false, true, true);
        let table = GarbledTable::garble_binary(
            &mut r,
            GateType::And,
            &a_pair,
            a_pbit,
            &b_pair,
            b_pbit,
            &out_pair,
            out_pbit,
        )
        .unwrap();

        for bit_a in [false, true] {
            for bit_b in [false, true] {
                let encr_bit_a = bit_a ^ a_pbit;
                let encr_bit_b = bit_b ^ b_pbit;
                let key_a = a_pair.key_for(bit_a);
                let key_b = b_pair.key_for(bit_b);
                let (key_out, encr_bit_out) =
                    table.evaluate_binary(0, encr_bit_a, encr_bit_b, key_a, key_b).unwrap();
                let bit_out = encr_bit_out ^ out_pbit;
                assert_eq!(bit_out, bit_a && bit_b);
                assert_eq!(&key_out, out_pair.key_for(bit_out));
            }
        }
    }

    #[test]
    fn decrypting_with_wrong_key_fails() {
        let mut r = rng();
        let a_pair = KeyPair::random(&mut r);
        let b_pair = KeyPair::random(&mut r);
        let out_pair = KeyPair::random(&mut r);
        let table = GarbledTable::garble_binary(
            &mut r,
            GateType::Xor,
            &a_pair,
            false,
            &b_pair,
            false,
            &out_pair,
            false,
        )
        .unwrap();
        let wrong_key = [0xAAu8; cipher::KEY_LEN];
        assert!(table.evaluate_binary(7, false, false, &wrong_key, b_pair.key_for(false)).is_err());
    }
}
