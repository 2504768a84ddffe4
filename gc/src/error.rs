//! Error taxonomy for circuit construction, garbling, evaluation and
//! oblivious transfer.

/// Errors produced while building, garbling, transmitting or evaluating a
/// circuit.
#[derive(Debug, thiserror::Error)]
pub enum GcError {
    /// The circuit description is structurally invalid: a gate references
    /// an undeclared wire, a wire id collides with a gate output id it
    /// should not, or an unsupported gate type was named.
    #[error("circuit {circuit_id}: malformed structure: {reason}")]
    CircuitStructure {
        /// Identifier of the offending circuit.
        circuit_id: String,
        /// Human-readable description of the structural problem.
        reason: String,
    },

    /// A cryptographic parameter (group order, key length, seed length)
    /// did not meet the contract expected by the caller.
    #[error("invalid cryptographic parameter: {0}")]
    CryptoParam(String),

    /// Decrypting a garbled-table entry failed authentication. This
    /// indicates either a wrong key (a bug in label bookkeeping) or
    /// tampering in transit.
    #[error("gate {gate_id}: failed to decrypt garbled row")]
    DecryptFailure {
        /// Identifier of the gate whose row failed to decrypt.
        gate_id: u32,
    },

    /// Evaluation reached a gate whose input wire has no resolved label
    /// or bit value yet, which means gates were not visited in a valid
    /// topological order or an input was never supplied.
    #[error("wire {0} has no resolved value at the point it was needed")]
    UnresolvedWire(u32),

    /// The underlying transport failed to send or receive a message.
    #[error("transport error: {0}")]
    TransportError(String),

    /// The process was asked to stop (e.g. via Ctrl-C) while idle between
    /// sessions.
    #[error("interrupted")]
    Interrupted,

    /// The prime-group setup could not find a prime or generator meeting
    /// its contract within the allotted number of attempts.
    #[error("exhausted candidate search while generating group parameters")]
    PrimalityExhausted,
}

impl GcError {
    /// Maps an error to a process exit code, stable across versions so
    /// callers can script against it.
    pub fn exit_code(&self) -> i32 {
        match self {
            GcError::CircuitStructure { .. } => 2,
            GcError::CryptoParam(_) => 3,
            GcError::DecryptFailure { .. } => 4,
            GcError::UnresolvedWire(_) => 5,
            GcError::TransportError(_) => 6,
            GcError::Interrupted => 130,
            GcError::PrimalityExhausted => 7,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GcError>;
