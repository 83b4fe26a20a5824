//! Integration test crate for the Cabbage compositor.
//!
//! This crate exists solely to hold cross-crate integration tests.
//! It drives `cabbage-compositor` through its public host-facing API.

#[cfg(test)]
mod support;

#[cfg(test)]
mod lifecycle;

#[cfg(test)]
mod context;

#[cfg(test)]
mod compositing;
