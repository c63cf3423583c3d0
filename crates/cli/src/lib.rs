//! Library side of the `filemeta` binary: command bodies and their output.
pub mod commands;
pub mod output;
pub mod tags;
