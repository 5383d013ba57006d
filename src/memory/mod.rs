//! Memory module - instruction records kept in the external store

pub mod instructions;

pub use instructions::{FieldChange, InstructionStore, PersistOutcome, StoredInstruction};
