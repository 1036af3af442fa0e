//! # kitchenconnect-domain
//!
//! Pure domain model for the kitchenconnect appliance remote control.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers, error conventions, timestamps
//! - Define the **Appliance** snapshot (identity, display data, properties)
//! - Define **Actions** (`turn_on`, `turn_off`, `change_program`, …) and the
//!   pure transitions they produce
//! - Derive presentation-independent read-only values (power label,
//!   temperature with unit glyph)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! The transport boundary is expressed as a trait in the `app` crate (port).

pub mod error;
pub mod id;
pub mod time;

pub mod action;
pub mod appliance;
