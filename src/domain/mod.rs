//! Ledger entities, the rules that keep them consistent, and the ports the
//! application layer talks through.

pub mod card_cipher;
pub mod message;
pub mod ports;
pub mod transaction;
