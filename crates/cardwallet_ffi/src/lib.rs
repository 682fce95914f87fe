//! Flutter-facing bindings for the card wallet core.

pub mod api;
