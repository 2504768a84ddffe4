//! Command-line driver for two-party garbled-circuit evaluation: `alice`
//! garbles and sends, `bob` listens and evaluates, `local` runs both
//! roles in one process for quick testing.

use std::collections::HashMap;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use gc::circuit::{CircuitFile, CircuitSpec, WireId};
use gc::driver::{self, run_garbler};
use gc::error::{GcError, Result};
use gc::transport::{EvaluatorListener, TcpTransport, DEFAULT_PORT};
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use tracing::{error, info};

/// Two-party secure function evaluation via garbled circuits.
#[derive(Parser, Debug)]
#[command(name = "gc-cli", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Act as the Garbler: garble the circuit and connect to a waiting Bob.
    Alice {
        /// Path to the circuit JSON file.
        circuit: std::path::PathBuf,
        /// Address of the Evaluator, `host:port`.
        #[arg(long, default_value = "127.0.0.1:4080")]
        connect: String,
        /// Comma-separated `wire=bit` list for the Garbler's own inputs.
        #[arg(long)]
        alice_inputs: String,
        /// Sends both garbled labels in clear instead of running OT.
        /// Refused unless `--i-understand-this-is-insecure` is also given.
        #[arg(long)]
        no_ot: bool,
        /// Required alongside `--no-ot` to acknowledge the session carries
        /// no oblivious-transfer privacy guarantee.
        #[arg(long)]
        i_understand_this_is_insecure: bool,
        /// Minimum severity of emitted log events.
        #[arg(long, value_enum, default_value_t = LogLevel::Info)]
        log_level: LogLevel,
    },
    /// Act as the Evaluator: listen for a Garbler and evaluate whatever
    /// circuit it sends.
    Bob {
        /// Port to listen on.
        #[arg(long, default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Comma-separated `wire=bit` list for the Evaluator's own inputs.
        #[arg(long)]
        bob_inputs: String,
        /// Receives both garbled labels in clear instead of running OT.
        /// Refused unless `--i-understand-this-is-insecure` is also given.
        #[arg(long)]
        no_ot: bool,
        /// Required alongside `--no-ot` to acknowledge the session carries
        /// no oblivious-transfer privacy guarantee.
        #[arg(long)]
        i_understand_this_is_insecure: bool,
        /// Minimum severity of emitted log events.
        #[arg(long, value_enum, default_value_t = LogLevel::Info)]
        log_level: LogLevel,
    },
    /// Run both roles in a single process, with no transport and no OT at
    /// all — for quick experimentation and debugging.
    Local {
        /// Path to the circuit JSON file.
        circuit: std::path::PathBuf,
        /// Comma-separated `wire=bit` list for the Garbler's inputs.
        #[arg(long)]
        alice_inputs: String,
        /// Comma-separated `wire=bit` list for the Evaluator's inputs.
        #[arg(long)]
        bob_inputs: String,
        /// What to print: the evaluated output bits, or the raw garbled
        /// table contents without decrypting them.
        #[arg(short = 'm', long, value_enum, default_value_t = LocalMode::Circuit)]
        mode: LocalMode,
        /// Minimum severity of emitted log events.
        #[arg(long, value_enum, default_value_t = LogLevel::Info)]
        log_level: LogLevel,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum LocalMode {
    Circuit,
    Table,
}

/// Parses a `wire=bit` comma-separated list, e.g. `1=1,2=0`.
fn parse_inputs(spec: &str) -> Result<HashMap<WireId, bool>> {
    let mut map = HashMap::new();
    if spec.trim().is_empty() {
        return Ok(map);
    }
    for entry in spec.split(',') {
        let (wire, bit) = entry.split_once('=').ok_or_else(|| GcError::CircuitStructure {
            circuit_id: "<cli input>".to_string(),
            reason: format!("expected wire=bit, got {entry:?}"),
        })?;
        let wire: WireId = wire.trim().parse().map_err(|_| GcError::CircuitStructure {
            circuit_id: "<cli input>".to_string(),
            reason: format!("invalid wire id {wire:?}"),
        })?;
        let bit = match bit.trim() {
            "0" => false,
            "1" => true,
            other => {
                return Err(GcError::CircuitStructure {
                    circuit_id: "<cli input>".to_string(),
                    reason: format!("invalid bit value {other:?}, expected 0 or 1"),
                })
            }
        };
        map.insert(wire, bit);
    }
    Ok(map)
}

/// Loads the single circuit from `path`; a circuit file with anything
/// other than exactly one circuit is rejected, since every CLI invocation
/// runs one session against one circuit.
fn load_single_circuit(path: &std::path::Path) -> Result<CircuitSpec> {
    let file = CircuitFile::load_json(path)?;
    match file.circuits.len() {
        1 => Ok(file.circuits.into_iter().next().expect("len checked above")),
        n => Err(GcError::CircuitStructure {
            circuit_id: path.display().to_string(),
            reason: format!("expected exactly one circuit in file, found {n}"),
        }),
    }
}

fn init_tracing(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::from(level))
        .init();
}

fn require_ot_or_opt_in(no_ot: bool, opt_in: bool) -> Result<bool> {
    if no_ot && !opt_in {
        return Err(GcError::CryptoParam(
            "--no-ot requires --i-understand-this-is-insecure outside local mode".to_string(),
        ));
    }
    Ok(!no_ot)
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Alice {
            circuit,
            connect,
            alice_inputs,
            no_ot,
            i_understand_this_is_insecure,
            log_level,
        } => {
            init_tracing(log_level);
            let ot_enabled = require_ot_or_opt_in(no_ot, i_understand_this_is_insecure)?;
            let circuit = load_single_circuit(&circuit)?;
            let alice_inputs = parse_inputs(&alice_inputs)?;
            let mut transport = TcpTransport::connect(&connect)?;
            let mut rng = ChaCha12Rng::from_seed(seed_from_os());
            info!(circuit_id = %circuit.id, circuit_name = %circuit.name, %connect, "connected to evaluator");
            let outputs = run_garbler(&mut transport, &circuit, &alice_inputs, ot_enabled, &mut rng)?;
            print_outputs(&outputs);
            Ok(())
        }
        Command::Bob {
            port,
            bob_inputs,
            no_ot,
            i_understand_this_is_insecure,
            log_level,
        } => {
            init_tracing(log_level);
            let ot_enabled = require_ot_or_opt_in(no_ot, i_understand_this_is_insecure)?;
            let bob_inputs = parse_inputs(&bob_inputs)?;
            listen_and_serve(port, &bob_inputs, ot_enabled)
        }
        Command::Local {
            circuit,
            alice_inputs,
            bob_inputs,
            mode,
            log_level,
        } => {
            init_tracing(log_level);
            let circuit = load_single_circuit(&circuit)?;
            let alice_inputs = parse_inputs(&alice_inputs)?;
            let bob_inputs = parse_inputs(&bob_inputs)?;
            match mode {
                LocalMode::Circuit => {
                    let outputs =
                        driver::run_local(&circuit, &alice_inputs, &bob_inputs, seed_from_os())?;
                    print_outputs(&outputs);
                }
                LocalMode::Table => print_table_debug(&circuit, seed_from_os())?,
            }
            Ok(())
        }
    }
}

fn seed_from_os() -> [u8; 32] {
    use rand::RngCore;
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    seed
}

fn print_outputs(outputs: &HashMap<WireId, bool>) {
    let mut wires: Vec<_> = outputs.keys().copied().collect();
    wires.sort_unstable();
    for wire in wires {
        println!("{wire}={}", outputs[&wire] as u8);
    }
}

/// Prints the p-bit map and raw ciphertext bytes of every gate's garbled
/// table, without ever decrypting a row — the debug aid spec.md §6 calls
/// out as distinct from a truth-table enumeration.
fn print_table_debug(circuit: &CircuitSpec, seed: [u8; 32]) -> Result<()> {
    let garbled = gc::garbler::GarbledCircuit::garble(circuit, seed)?;
    println!("circuit: {} ({})", circuit.name, circuit.id);
    let mut wires: Vec<_> = garbled.pbits.keys().copied().collect();
    wires.sort_unstable();
    println!("p-bits:");
    for wire in &wires {
        println!("  {wire}={}", garbled.pbits[wire] as u8);
    }
    let mut gate_ids: Vec<_> = garbled.tables.keys().copied().collect();
    gate_ids.sort_unstable();
    for gate_id in gate_ids {
        println!("gate {gate_id}:");
        for (i, row) in garbled.tables[&gate_id].rows().iter().enumerate() {
            println!("  row {i}: {}", hex_encode(&row.0));
        }
    }
    Ok(())
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Accepts one Garbler session at a time, evaluating each to completion
/// before listening again. SIGINT between sessions stops the loop
/// cleanly; SIGINT during an active session still completes that session.
fn listen_and_serve(port: u16, bob_inputs: &HashMap<WireId, bool>, ot_enabled: bool) -> Result<()> {
    let listener = EvaluatorListener::bind(("0.0.0.0", port))?;
    listener.set_nonblocking(true)?;

    let interrupted = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupted);
    ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst))
        .map_err(|e| GcError::TransportError(format!("failed to install signal handler: {e}")))?;

    info!(port, "listening for garbler connections");
    loop {
        if interrupted.load(Ordering::SeqCst) {
            info!("shutting down");
            return Err(GcError::Interrupted);
        }
        match listener.try_accept()? {
            Some(mut transport) => {
                info!("accepted garbler connection");
                let mut rng = ChaCha12Rng::from_seed(seed_from_os());
                if let Err(e) = driver::run_evaluator(&mut transport, bob_inputs, ot_enabled, &mut rng) {
                    error!(error = %e, "session failed");
                }
            }
            None => std::thread::sleep(std::time::Duration::from_millis(50)),
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "exiting");
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parse_inputs_reads_wire_bit_pairs() {
        let parsed = parse_inputs("1=1,2=0,3=1").unwrap();
        assert_eq!(parsed.get(&1), Some(&true));
        assert_eq!(parsed.get(&2), Some(&false));
        assert_eq!(parsed.get(&3), Some(&true));
    }

    #[test]
    fn parse_inputs_accepts_empty_spec() {
        assert!(parse_inputs("").unwrap().is_empty());
        assert!(parse_inputs("   ").unwrap().is_empty());
    }

    #[test]
    fn parse_inputs_rejects_malformed_entries() {
        assert!(parse_inputs("1").is_err());
        assert!(parse_inputs("1=2").is_err());
        assert!(parse_inputs("x=1").is_err());
    }

    #[test]
    fn require_ot_or_opt_in_refuses_bare_no_ot() {
        assert!(require_ot_or_opt_in(true, false).is_err());
        assert_eq!(require_ot_or_opt_in(true, true).unwrap(), false);
        assert_eq!(require_ot_or_opt_in(false, false).unwrap(), true);
    }

    #[test]
    fn load_single_circuit_rejects_multi_circuit_files() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let contents = serde_json::json!({
            "circuits": [
                {"name": "A", "id": "a", "alice": [1], "bob": [], "out": [2],
                 "gates": [{"id": 2, "type": "NOT", "in": [1]}]},
                {"name": "B", "id": "b", "alice": [1], "bob": [], "out": [2],
                 "gates": [{"id": 2, "type": "NOT", "in": [1]}]},
            ]
        });
        tmp.write_all(serde_json::to_string(&contents).unwrap().as_bytes()).unwrap();
        assert!(load_single_circuit(tmp.path()).is_err());
    }

    #[test]
    fn load_single_circuit_accepts_a_single_circuit() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        let contents = serde_json::json!({
            "circuits": [
                {"name": "A", "id": "a", "alice": [1], "bob": [], "out": [2],
                 "gates": [{"id": 2, "type": "NOT", "in": [1]}]},
            ]
        });
        tmp.write_all(serde_json::to_string(&contents).unwrap().as_bytes()).unwrap();
        let circuit = load_single_circuit(tmp.path()).unwrap();
        assert_eq!(circuit.id, "a");
    }
}
