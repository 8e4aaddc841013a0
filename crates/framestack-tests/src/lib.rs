//! Integration test crate for Framestack.
//!
//! This crate exists solely to hold cross-crate integration tests. They run
//! the compositor against the shipped collaborators: the threaded decoder,
//! the software backend and the audio engine.

#[cfg(test)]
mod common;

#[cfg(test)]
mod compositing;

#[cfg(test)]
mod nesting;

#[cfg(test)]
mod lifecycle;

#[cfg(test)]
mod audio;
