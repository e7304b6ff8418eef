//! Layered settings: struct defaults, then `config.toml`, then
//! `CHORDSYNC__*` environment variables.
//!
//! Sections map onto the parts of the player they tune: audio output and
//! source reuse, waveform zoom, UI timing, skip length, catalog scanning and
//! log output.

mod load;
mod schema;

pub use schema::*;

#[cfg(test)]
mod tests;
