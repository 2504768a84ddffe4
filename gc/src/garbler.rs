//! Garbler-side circuit construction: assigns a key pair and permutation
//! bit to every wire, then garbles each gate's table.

use std::collections::HashMap;

use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::circuit::{CircuitSpec, GateType, WireId};
use crate::error::Result;
use crate::gate::{GarbledTable, KeyPair, PBit};

/// A fully garbled circuit: per-wire key pairs and permutation bits, plus
/// a garbled table per gate. Everything an Evaluator needs except the
/// actual input labels, which are delivered separately (directly for
/// Alice's wires, via oblivious transfer for Bob's).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GarbledCircuit {
    /// Echoes the source circuit's identifier.
    pub circuit_id: String,
    /// Key pair for every wire in the circuit (inputs and gate outputs).
    pub keys: HashMap<WireId, KeyPair>,
    /// Permutation bit for every wire in the circuit.
    pub pbits: HashMap<WireId, PBit>,
    /// Garbled table per gate, keyed by the gate's output wire id.
    pub tables: HashMap<WireId, GarbledTable>,
    /// Output wires, carried through so the Evaluator knows which final
    /// bits to report.
    pub out: Vec<WireId>,
}

impl GarbledCircuit {
    /// Garbles `circuit` using randomness derived from `seed`. Garbling
    /// the same circuit with the same seed always produces identical
    /// keys, p-bits and tables.
    pub fn garble(circuit: &CircuitSpec, seed: [u8; 32]) -> Result<Self> {
        let mut rng = ChaCha12Rng::from_seed(seed);
        let wires = circuit.wires();
        debug!(circuit_id = %circuit.id, circuit_name = %circuit.name, wire_count = wires.len(), "garbling circuit");

        let mut pbits = HashMap::with_capacity(wires.len());
        let mut keys = HashMap::with_capacity(wires.len());
        for &wire in &wires {
            pbits.insert(wire, {
                use rand::RngCore;
                (rng.next_u32() & 1) == 1
            });
            keys.insert(wire, KeyPair::random(&mut rng));
        }

        let mut gates_sorted = circuit.gates.clone();
        gates_sorted.sort_by_key(|g| g.id);

        let mut tables = HashMap::with_capacity(gates_sorted.len());
        for gate in &gates_sorted {
            let out_pair = &keys[&gate.id];
            let out_pbit = pbits[&gate.id];
            let table = if gate.gate_type == GateType::Not {
                let in_wire = gate.inputs[0];
                GarbledTable::garble_not(
                    &mut rng,
                    &keys[&in_wire],
                    pbits[&in_wire],
                    out_pair,
                    out_pbit,
                )?
            } else {
                let a_wire = gate.inputs[0];
                let b_wire = gate.inputs[1];
                GarbledTable::garble_binary(
                    &mut rng,
                    gate.gate_type,
                    &keys[&a_wire],
                    pbits[&a_wire],
                    &keys[&b_wire],
                    pbits[&b_wire],
                    out_pair,
                    out_pbit,
                )?
            };
            tables.insert(gate.id, table);
        }

        debug!(circuit_id = %circuit.id, "garbling complete");
        Ok(GarbledCircuit {
            circuit_id: circuit.id.clone(),
            keys,
            pbits,
            tables,
            out: circuit.out.clone(),
        })
    }

    /// The `(key_for_bit, encrypted_bit)` pair for `wire` given its
    /// plaintext bit value — the representation Alice sends directly for
    /// her own inputs and that the Evaluator obtains via OT for Bob's.
    pub fn input_label(&self, wire: WireId, bit: bool) -> (crate::cipher::Key, bool) {
        let pair = &self.keys[&wire];
        let pbit = self.pbits[&wire];
        (*pair.key_for(bit), bit ^ pbit)
    }

    /// The permutation bits restricted to the declared output wires — the
    /// only part of `pbits` that ever crosses the wire to the Evaluator
    /// (spec.md §4.7); the full map stays on the Garbler's side.
    pub fn pbits_out(&self) -> HashMap<WireId, PBit> {
        self.out.iter().map(|&w| (w, self.pbits[&w])).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::GateSpec;

    fn and_circuit() -> CircuitSpec {
        CircuitSpec {
            name: "AND2".to_string(),
            id: "and2".to_string(),
            alice: vec![1],
            bob: vec![2],
            out: vec![3],
            gates: vec![GateSpec {
                id: 3,
                gate_type: GateType::And,
                inputs: vec![1, 2],
            }],
        }
    }

    #[test]
    fn garbling_is_deterministic_under_fixed_seed() {
        let circuit = and_circuit();
        let a = GarbledCircuit::garble(&circuit, [1u8; 32]).unwrap();
        let b = GarbledCircuit::garble(&circuit, [1u8; 32]).unwrap();
        assert_eq!(a.pbits, b.pbits);
        for wire in circuit.wires() {
            assert_eq!(a.keys[&wire].key_for(false), b.keys[&wire].key_for(false));
        }
    }

    #[test]
    fn garbling_covers_every_wire_and_gate() {
        let circuit = and_circuit();
        let garbled = GarbledCircuit::garble(&circuit, [2u8; 32]).unwrap();
        assert_eq!(garbled.keys.len(), 3);
        assert_eq!(garbled.pbits.len(), 3);
        assert_eq!(garbled.tables.len(), 1);
        assert!(garbled.tables.contains_key(&3));
    }

    #[test]
    fn input_label_reflects_permutation_bit() {
        let circuit = and_circuit();
        let garbled = GarbledCircuit::garble(&circuit, [3u8; 32]).unwrap();
        let pbit = garbled.pbits[&1];
        let (_, encr_bit) = garbled.input_label(1, true);
        assert_eq!(encr_bit, true ^ pbit);
    }
}
