//! Protocol orchestration: the message sequence of spec.md §4.7, run
//! either over a real [`Transport`] (`run_garbler`/`run_evaluator`) or, for
//! the `local` CLI mode and fast tests, entirely in-process with no
//! transport at all (`run_local`).

use std::collections::HashMap;

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha12Rng;
use tracing::debug;

use crate::circuit::{CircuitSpec, WireId};
use crate::cipher::Key;
use crate::error::{GcError, Result};
use crate::evaluator::{evaluate_circuit, evaluate_with_output_pbits};
use crate::garbler::GarbledCircuit;
use crate::gate::GarbledTable;
use crate::ot;
use crate::transport::Transport;

/// A resolved wire label: the active key together with its permuted bit,
/// the wire-message shape spec.md §9 asks for explicitly.
type WireLabel = (Key, bool);

fn encode_label(label: &WireLabel) -> Result<Vec<u8>> {
    bincode::serde::encode_to_vec(label, bincode::config::standard())
        .map_err(|e| GcError::TransportError(format!("label encoding failed: {e}")))
}

fn decode_label(bytes: &[u8]) -> Result<WireLabel> {
    bincode::serde::decode_from_slice(bytes, bincode::config::standard())
        .map(|(value, _)| value)
        .map_err(|e| GcError::TransportError(format!("label decoding failed: {e}")))
}

/// Runs the Garbler's side of the protocol for one circuit instance:
/// garbles it, sends the three handshake messages, sends Alice's own
/// input labels in clear, runs one OT per Bob input wire, and returns the
/// output bits the Evaluator reports back.
pub fn run_garbler<X: Transport, R: RngCore>(
    transport: &mut X,
    circuit: &CircuitSpec,
    alice_inputs: &HashMap<WireId, bool>,
    ot_enabled: bool,
    rng: &mut R,
) -> Result<HashMap<WireId, bool>> {
    circuit.validate()?;
    let mut seed = [0u8; 32];
    rng.fill_bytes(&mut seed);
    let garbled = GarbledCircuit::garble(circuit, seed)?;
    debug!(circuit_id = %circuit.id, circuit_name = %circuit.name, "sending circuit structure");

    let _ack: bool = transport.send_wait(circuit)?;
    let _ack: bool = transport.send_wait(&garbled.tables)?;
    let pbits_out = garbled.pbits_out();
    let _ack: bool = transport.send_wait(&pbits_out)?;

    let a_inputs: HashMap<WireId, WireLabel> = circuit
        .alice
        .iter()
        .map(|&w| {
            let bit = *alice_inputs
                .get(&w)
                .ok_or_else(|| GcError::CircuitStructure {
                    circuit_id: circuit.id.clone(),
                    reason: format!("no input supplied for alice wire {w}"),
                })?;
            Ok((w, garbled.input_label(w, bit)))
        })
        .collect::<Result<_>>()?;
    transport.send(&a_inputs)?;

    for _ in 0..circuit.bob.len() {
        let wire: WireId = transport.receive()?;
        debug!(wire, "performing OT for evaluator input wire");
        let label0 = encode_label(&garbled.input_label(wire, false))?;
        let label1 = encode_label(&garbled.input_label(wire, true))?;
        if ot_enabled {
            ot::garbler_side(transport, rng, (&label0, &label1))?;
        } else {
            transport.send(&(label0, label1))?;
        }
    }

    let outputs: HashMap<WireId, bool> = transport.receive()?;
    debug!(circuit_id = %circuit.id, "received evaluation result");
    Ok(outputs)
}

/// Runs the Evaluator's side of one session: receives the circuit
/// structure and garbled tables, the Garbler's own input labels, performs
/// one OT per Bob input wire to recover its own labels, evaluates, and
/// sends the output bits back.
pub fn run_evaluator<X: Transport, R: RngCore>(
    transport: &mut X,
    bob_inputs: &HashMap<WireId, bool>,
    ot_enabled: bool,
    rng: &mut R,
) -> Result<()> {
    let circuit: CircuitSpec = transport.receive()?;
    circuit.validate()?;
    transport.send(&true)?;

    let tables: HashMap<WireId, GarbledTable> = transport.receive()?;
    transport.send(&true)?;

    let pbits_out: HashMap<WireId, bool> = transport.receive()?;
    transport.send(&true)?;

    let a_inputs: HashMap<WireId, WireLabel> = transport.receive()?;

    let mut b_inputs: HashMap<WireId, WireLabel> = HashMap::with_capacity(circuit.bob.len());
    for &wire in &circuit.bob {
        transport.send(&wire)?;
        let beta = *bob_inputs
            .get(&wire)
            .ok_or_else(|| GcError::CircuitStructure {
                circuit_id: circuit.id.clone(),
                reason: format!("no input supplied for bob wire {wire}"),
            })?;
        let label = if ot_enabled {
            decode_label(&ot::evaluator_side(transport, rng, beta)?)?
        } else {
            let (label0, label1): (Vec<u8>, Vec<u8>) = transport.receive()?;
            decode_label(if beta { &label1 } else { &label0 })?
        };
        b_inputs.insert(wire, label);
    }

    let outputs = evaluate_with_output_pbits(&circuit, &tables, &pbits_out, &a_inputs, &b_inputs)?;
    transport.send(&outputs)?;
    debug!(circuit_id = %circuit.id, "sent evaluation result");
    Ok(())
}

/// Runs both roles in one process with no transport at all: builds the
/// `GarbledCircuit` and calls the evaluator directly, the way spec.md §6
/// describes the `local` CLI mode. There is no OT here — both labels are
/// already in memory, so this path is never "OT disabled", it simply
/// never needed OT to begin with.
pub fn run_local(
    circuit: &CircuitSpec,
    alice_inputs: &HashMap<WireId, bool>,
    bob_inputs: &HashMap<WireId, bool>,
    seed: [u8; 32],
) -> Result<HashMap<WireId, bool>> {
    circuit.validate()?;
    let garbled = GarbledCircuit::garble(circuit, seed)?;

    let a_labels: HashMap<WireId, WireLabel> = circuit
        .alice
        .iter()
        .map(|&w| (w, garbled.input_label(w, alice_inputs[&w])))
        .collect();
    let b_labels: HashMap<WireId, WireLabel> = circuit
        .bob
        .iter()
        .map(|&w| (w, garbled.input_label(w, bob_inputs[&w])))
        .collect();

    evaluate_circuit(circuit, &garbled, &a_labels, &b_labels)
}

/// Convenience constructor for a deterministic, OS-seeded RNG, used by
/// both CLI entry points that need fresh randomness outside of tests.
pub fn os_seeded_rng() -> ChaCha12Rng {
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    ChaCha12Rng::from_seed(seed)
}
