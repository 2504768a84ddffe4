//! Evaluator-side circuit evaluation: walks gates in ascending wire order,
//! decrypting exactly one row per gate via point-and-permute indexing.

use std::collections::HashMap;

use tracing::debug;

use crate::circuit::{CircuitSpec, GateType, WireId};
use crate::cipher::Key;
use crate::error::{GcError, Result};
use crate::garbler::GarbledCircuit;
use crate::gate::GarbledTable;

/// A resolved wire value during evaluation: the active key label together
/// with its permuted (encrypted) bit.
type WireValue = (Key, bool);

/// Evaluates a circuit from exactly what the Evaluator legitimately has:
/// the garbled tables and the *output* wires' permutation bits (never the
/// Garbler's full per-wire `pbits` map, which stays on the Garbler's side
/// per spec.md §4.4/§4.7). Walks gates in ascending wire-id order,
/// decrypting exactly one row per gate via point-and-permute indexing.
///
/// `alice_inputs` and `bob_inputs` together must cover every wire in
/// `circuit.alice` and `circuit.bob`; evaluation of a gate referencing an
/// unresolved wire fails with [`GcError::UnresolvedWire`].
pub fn evaluate_with_output_pbits(
    circuit: &CircuitSpec,
    tables: &HashMap<WireId, GarbledTable>,
    pbits_out: &HashMap<WireId, bool>,
    alice_inputs: &HashMap<WireId, WireValue>,
    bob_inputs: &HashMap<WireId, WireValue>,
) -> Result<HashMap<WireId, bool>> {
    let mut wire_values: HashMap<WireId, WireValue> = HashMap::new();
    wire_values.extend(alice_inputs.iter().map(|(&w, &v)| (w, v)));
    wire_values.extend(bob_inputs.iter().map(|(&w, &v)| (w, v)));

    let mut gates_sorted = circuit.gates.clone();
    gates_sorted.sort_by_key(|g| g.id);

    for gate in &gates_sorted {
        let table = tables.get(&gate.id).ok_or(GcError::UnresolvedWire(gate.id))?;

        let value = if gate.gate_type == GateType::Not {
            let (key_in, encr_bit_in) = *wire_values
                .get(&gate.inputs[0])
                .ok_or(GcError::UnresolvedWire(gate.inputs[0]))?;
            table.evaluate_not(gate.id, encr_bit_in, &key_in)?
        } else {
            let (key_a, encr_bit_a) = *wire_values
                .get(&gate.inputs[0])
                .ok_or(GcError::UnresolvedWire(gate.inputs[0]))?;
            let (key_b, encr_bit_b) = *wire_values
                .get(&gate.inputs[1])
                .ok_or(GcError::UnresolvedWire(gate.inputs[1]))?;
            table.evaluate_binary(gate.id, encr_bit_a, encr_bit_b, &key_a, &key_b)?
        };

        wire_values.insert(gate.id, value);
    }

    let mut evaluation = HashMap::with_capacity(circuit.out.len());
    for &out_wire in &circuit.out {
        let (_, encr_bit) = wire_values
            .get(&out_wire)
            .ok_or(GcError::UnresolvedWire(out_wire))?;
        let pbit = pbits_out.get(&out_wire).ok_or(GcError::UnresolvedWire(out_wire))?;
        evaluation.insert(out_wire, encr_bit ^ pbit);
    }

    debug!(circuit_id = %circuit.id, circuit_name = %circuit.name, outputs = evaluation.len(), "evaluation complete");
    Ok(evaluation)
}

/// Convenience entry point for callers that already hold the full
/// [`GarbledCircuit`] in-process (the `local` CLI mode and same-process
/// tests) — restricts its pbits to the output wires before delegating to
/// [`evaluate_with_output_pbits`], the same path the transport-based
/// driver uses.
pub fn evaluate_circuit(
    circuit: &CircuitSpec,
    garbled: &GarbledCircuit,
    alice_inputs: &HashMap<WireId, WireValue>,
    bob_inputs: &HashMap<WireId, WireValue>,
) -> Result<HashMap<WireId, bool>> {
    evaluate_with_output_pbits(
        circuit,
        &garbled.tables,
        &garbled.pbits_out(),
        alice_inputs,
        bob_inputs,
    )
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

    fn eval_with(circuit: &CircuitSpec, alice_bit: bool, bob_bit: bool) -> bool {
        let garbled = GarbledCircuit::garble(circuit, [9u8; 32]).unwrap();
        let mut alice = HashMap::new();
        alice.insert(1u32, garbled.input_label(1, alice_bit));
        let mut bob = HashMap::new();
        bob.insert(2u32, garbled.input_label(2, bob_bit));
        let out = evaluate_circuit(circuit, &garbled, &alice, &bob).unwrap();
        out[&3]
    }

    #[test]
    fn and_gate_matches_truth_table_for_all_inputs() {
        let circuit = and_circuit();
        for a in [false, true] {
            for b in [false, true] {
                assert_eq!(eval_with(&circuit, a, b), a && b);
            }
        }
    }

    #[test]
    fn unresolved_wire_is_reported() {
        let circuit = and_circuit();
        let garbled = GarbledCircuit::garble(&circuit, [9u8; 32]).unwrap();
        let alice = HashMap::new();
        let bob = HashMap::new();
        let result = evaluate_circuit(&circuit, &garbled, &alice, &bob);
        assert!(matches!(result, Err(GcError::UnresolvedWire(_))));
    }

    #[test]
    fn not_gate_chain() {
        let circuit = CircuitSpec {
            name: "NOT chain".to_string(),
            id: "not_chain".to_string(),
            alice: vec![1],
            bob: vec![],
            out: vec![3],
            gates: vec![
                GateSpec { id: 2, gate_type: GateType::Not, inputs: vec![1] },
                GateSpec { id: 3, gate_type: GateType::Not, inputs: vec![2] },
            ],
        };
        let garbled = GarbledCircuit::garble(&circuit, [4u8; 32]).unwrap();
        let mut alice = HashMap::new();
        alice.insert(1u32, garbled.input_label(1, true));
        let bob = HashMap::new();
        let out = evaluate_circuit(&circuit, &garbled, &alice, &bob).unwrap();
        assert_eq!(out[&3], true);
    }
}
