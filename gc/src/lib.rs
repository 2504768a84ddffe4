//! Two-party secure function evaluation via Yao's garbled-circuit protocol
//! with a Bellare–Micali 1-out-of-2 oblivious transfer for the Evaluator's
//! inputs.
//!
//! This crate implements the three tightly-coupled subsystems that make up
//! the protocol core: the garbled-circuit constructor ([`garbler`]), the
//! garbled-circuit evaluator ([`evaluator`]), and the oblivious-transfer
//! primitive ([`ot`]) over a prime-order cyclic group ([`prime_group`]).
//! [`driver`] orchestrates both parties' message exchange over a
//! [`transport`], for the `gc-cli` binary and for tests.

#![deny(unreachable_pub)]

pub mod cipher;
pub mod circuit;
pub mod driver;
pub mod error;
pub mod evaluator;
pub mod garbler;
pub mod gate;
pub mod ot;
pub mod prime_group;
pub mod transport;

pub use error::{GcError, Result};
