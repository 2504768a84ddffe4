//! Circuit description: the boolean-gate graph both parties agree on
//! ahead of time, loaded from a JSON file.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GcError, Result};

/// Identifier of a wire. Also used as the identifier of the gate whose
/// output the wire carries, since every internal wire is produced by
/// exactly one gate.
pub type WireId = u32;

/// The boolean operator a two-input (or, for `Not`, one-input) gate
/// computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateType {
    /// Logical AND.
    And,
    /// Logical OR.
    Or,
    /// Logical XOR.
    Xor,
    /// Logical NAND.
    Nand,
    /// Logical NOR.
    Nor,
    /// Logical XNOR.
    Xnor,
    /// Logical NOT. The only gate type with a single input.
    Not,
}

impl GateType {
    /// Number of input wires this gate type takes.
    pub fn arity(self) -> usize {
        match self {
            GateType::Not => 1,
            _ => 2,
        }
    }

    /// Evaluates the gate's truth table on plaintext bits. `b` is ignored
    /// for `Not`.
    pub fn apply(self, a: bool, b: bool) -> bool {
        match self {
            GateType::And => a && b,
            GateType::Or => a || b,
            GateType::Xor => a ^ b,
            GateType::Nand => !(a && b),
            GateType::Nor => !(a || b),
            GateType::Xnor => !(a ^ b),
            GateType::Not => !a,
        }
    }
}

/// A single gate: its output wire id, its operator, and its input wires.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateSpec {
    /// The wire id this gate's output is carried on.
    pub id: WireId,
    /// The operator this gate computes.
    #[serde(rename = "type")]
    pub gate_type: GateType,
    /// The gate's input wires, in order. `Not` gates have exactly one.
    #[serde(rename = "in")]
    pub inputs: Vec<WireId>,
}

/// A full circuit: its input partition between the two parties, its
/// output wires, and its gate list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitSpec {
    /// Human-readable name, echoed back in `-m table`/log output but not
    /// otherwise load-bearing.
    pub name: String,
    /// Identifier used in log messages and error reports.
    pub id: String,
    /// Wires supplied by the Garbler.
    #[serde(default)]
    pub alice: Vec<WireId>,
    /// Wires supplied by the Evaluator, obtained via oblivious transfer.
    #[serde(default)]
    pub bob: Vec<WireId>,
    /// Wires whose final bit value is reported back to both parties.
    pub out: Vec<WireId>,
    /// The gate list. Evaluated in ascending order of `id`.
    pub gates: Vec<GateSpec>,
}

/// A JSON file holding one or more circuit descriptions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitFile {
    /// The circuits contained in the file.
    pub circuits: Vec<CircuitSpec>,
}

impl CircuitFile {
    /// Loads and validates every circuit in a JSON file.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref()).map_err(|e| GcError::CircuitStructure {
            circuit_id: path.as_ref().display().to_string(),
            reason: format!("could not read file: {e}"),
        })?;
        let file: CircuitFile = serde_json::from_str(&data).map_err(|e| GcError::CircuitStructure {
            circuit_id: path.as_ref().display().to_string(),
            reason: format!("invalid JSON: {e}"),
        })?;
        for circuit in &file.circuits {
            circuit.validate()?;
        }
        Ok(file)
    }
}

impl CircuitSpec {
    /// All wire ids that appear anywhere in the circuit: declared inputs
    /// plus every gate's output id.
    pub fn wires(&self) -> HashSet<WireId> {
        let mut wires: HashSet<WireId> = self.alice.iter().chain(&self.bob).copied().collect();
        wires.extend(self.gates.iter().map(|g| g.id));
        wires
    }

    /// Checks structural invariants: no wire is claimed by both parties,
    /// no two gates share an output id, every gate has the arity its type
    /// requires, every gate input resolves to a declared input wire or an
    /// earlier gate's output, and every output wire resolves to a gate
    /// output (spec.md §3: `out` ⊆ gate outputs, not merely "some wire in
    /// the circuit" — an undifferentiated Alice/Bob input wire may not be
    /// declared as an output).
    pub fn validate(&self) -> Result<()> {
        let mut alice_set = HashSet::new();
        for &w in &self.alice {
            if !alice_set.insert(w) {
                return Err(self.structural_error(format!("wire {w} declared twice in alice inputs")));
            }
        }
        let mut bob_set = HashSet::new();
        for &w in &self.bob {
            if !bob_set.insert(w) {
                return Err(self.structural_error(format!("wire {w} declared twice in bob inputs")));
            }
            if alice_set.contains(&w) {
                return Err(self.structural_error(format!("wire {w} claimed by both parties")));
            }
        }

        let mut known: HashSet<WireId> = alice_set.union(&bob_set).copied().collect();
        let mut gate_outputs = HashSet::new();
        let mut gates_sorted = self.gates.clone();
        gates_sorted.sort_by_key(|g| g.id);

        for gate in &gates_sorted {
            if known.contains(&gate.id) || !gate_outputs.insert(gate.id) {
                return Err(self.structural_error(format!("gate output wire {} reused", gate.id)));
            }
            if gate.inputs.len() != gate.gate_type.arity() {
                return Err(self.structural_error(format!(
                    "gate {} ({:?}) expects {} input(s), got {}",
                    gate.id,
                    gate.gate_type,
                    gate.gate_type.arity(),
                    gate.inputs.len()
                )));
            }
            for &input in &gate.inputs {
                if !known.contains(&input) {
                    return Err(self.structural_error(format!(
                        "gate {} references wire {input} before it is produced",
                        gate.id
                    )));
                }
            }
            known.insert(gate.id);
        }

        if self.out.is_empty() {
            return Err(self.structural_error("circuit declares no output wires".to_string()));
        }
        for &w in &self.out {
            if !gate_outputs.contains(&w) {
                return Err(self.structural_error(format!("output wire {w} is not a gate output")));
            }
        }

        Ok(())
    }

    fn structural_error(&self, reason: String) -> GcError {
        GcError::CircuitStructure {
            circuit_id: self.id.clone(),
            reason,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn and_gate_circuit() -> CircuitSpec {
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
    fn valid_circuit_passes_validation() {
        assert!(and_gate_circuit().validate().is_ok());
    }

    #[test]
    fn rejects_wire_claimed_by_both_parties() {
        let mut c = and_gate_circuit();
        c.bob.push(1);
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_gate_referencing_unknown_wire() {
        let mut c = and_gate_circuit();
        c.gates[0].inputs = vec![1, 99];
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_wrong_arity() {
        let mut c = and_gate_circuit();
        c.gates[0].inputs = vec![1];
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_unproduced_output_wire() {
        let mut c = and_gate_circuit();
        c.out = vec![42];
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_input_wire_declared_as_output() {
        let mut c = and_gate_circuit();
        c.out = vec![1];
        assert!(c.validate().is_err());
    }

    #[test]
    fn not_gate_takes_single_input() {
        let c = CircuitSpec {
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
        assert!(c.validate().is_ok());
        assert!(!GateType::Not.apply(true, false));
    }

    #[test]
    fn gate_truth_tables() {
        assert!(GateType::And.apply(true, true));
        assert!(!GateType::And.apply(true, false));
        assert!(GateType::Or.apply(true, false));
        assert!(GateType::Xor.apply(true, false));
        assert!(!GateType::Xor.apply(true, true));
        assert!(GateType::Nand.apply(false, false));
        assert!(GateType::Nor.apply(false, false));
        assert!(GateType::Xnor.apply(true, true));
    }

    #[test]
    fn loads_and_validates_circuit_from_file() {
        use std::io::Write;
        let file = CircuitFile { circuits: vec![and_gate_circuit()] };
        let json = serde_json::to_string(&file).unwrap();
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(json.as_bytes()).unwrap();
        let loaded = CircuitFile::load_json(tmp.path()).unwrap();
        assert_eq!(loaded.circuits.len(), 1);
        assert_eq!(loaded.circuits[0].id, "and2");
        assert_eq!(loaded.circuits[0].name, "AND2");
    }

    #[test]
    fn rejects_invalid_json() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        use std::io::Write;
        tmp.write_all(b"not json").unwrap();
        assert!(CircuitFile::load_json(tmp.path()).is_err());
    }
}
