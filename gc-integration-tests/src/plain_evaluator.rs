//! Plaintext ground truth: evaluates a [`CircuitSpec`] directly on boolean
//! inputs, with no garbling or encryption involved, so the garbled-circuit
//! protocol's output can be checked against it.

use std::collections::HashMap;

use gc::circuit::{CircuitSpec, WireId};
use gc::error::{GcError, Result};

/// Evaluates `circuit` on plaintext inputs, returning the bit on every
/// declared output wire. `alice_inputs` and `bob_inputs` together must
/// cover every wire in `circuit.alice`/`circuit.bob`.
pub fn evaluate_plain_circuit(
    circuit: &CircuitSpec,
    alice_inputs: &HashMap<WireId, bool>,
    bob_inputs: &HashMap<WireId, bool>,
) -> Result<HashMap<WireId, bool>> {
    let mut wire_values: HashMap<WireId, bool> = HashMap::new();
    wire_values.extend(alice_inputs.iter().map(|(&w, &v)| (w, v)));
    wire_values.extend(bob_inputs.iter().map(|(&w, &v)| (w, v)));

    let mut gates_sorted = circuit.gates.clone();
    gates_sorted.sort_by_key(|g| g.id);

    for gate in &gates_sorted {
        let a = *wire_values
            .get(&gate.inputs[0])
            .ok_or(GcError::UnresolvedWire(gate.inputs[0]))?;
        let b = if gate.inputs.len() > 1 {
            *wire_values
                .get(&gate.inputs[1])
                .ok_or(GcError::UnresolvedWire(gate.inputs[1]))?
        } else {
            false
        };
        wire_values.insert(gate.id, gate.gate_type.apply(a, b));
    }

    let mut outputs = HashMap::with_capacity(circuit.out.len());
    for &wire in &circuit.out {
        let value = *wire_values.get(&wire).ok_or(GcError::UnresolvedWire(wire))?;
        outputs.insert(wire, value);
    }
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gc::circuit::{GateSpec, GateType};

    #[test]
    fn and_gate_matches_truth_table() {
        let circuit = CircuitSpec {
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
        };
        for a in [false, true] {
            for b in [false, true] {
                let mut alice = HashMap::new();
                alice.insert(1u32, a);
                let mut bob = HashMap::new();
                bob.insert(2u32, b);
                let out = evaluate_plain_circuit(&circuit, &alice, &bob).unwrap();
                assert_eq!(out[&3], a && b);
            }
        }
    }

    #[test]
    fn not_gate_takes_a_single_input() {
        let circuit = CircuitSpec {
            name: "NOT1".to_string(),
            id: "not1".to_string(),
            alice: vec![1],
            bob: vec![],
            out: vec![2],
            gates: vec![GateSpec {
                id: 2,
                gate_type: GateType::Not,
                inputs: vec![1],
            }],
        };
        let mut alice = HashMap::new();
        alice.insert(1u32, true);
        let out = evaluate_plain_circuit(&circuit, &alice, &HashMap::new()).unwrap();
        assert_eq!(out[&2], false);
    }
}
