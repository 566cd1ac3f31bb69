//! # Datum/Redeemer Encoder
//!
//! Typed messages exchanged with the two validators, and the generic Plutus
//! data model they are encoded through.
//!
//! ```text
//! data.rs   — PlutusData and its CBOR encoding/decoding
//! badge.rs  — BadgeDatum, MintRedeemer, HolderRedeemer
//! ```

pub mod badge;
pub mod data;

pub use badge::{BadgeDatum, HolderRedeemer, MintRedeemer, RedeemerArgs};
pub use data::PlutusData;
