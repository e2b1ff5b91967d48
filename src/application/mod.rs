//! Application layer containing the core business logic orchestration.
//!
//! This module defines the `PaymentEngine`, the entry point for pay, cancel
//! and find. It composes the ledger with the store and settlement ports and
//! guards payment creation with a per-card `AdmissionGate`.

pub mod admission;
pub mod engine;
pub mod requests;
