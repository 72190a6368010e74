// src/exec/mod.rs

//! Process execution layer.
//!
//! This module launches one external process and turns everything observable
//! about it into a single stream of `TaskEvent`s.
//!
//! - [`process`] spawns the child with stdin/stdout/stderr piped and reports
//!   how it terminated.
//! - [`reader`] turns a stdout or stderr pipe into chunk events.
//! - [`decode`] keeps multi-byte characters intact across reads.
//! - [`stdin`] feeds a lazy source of strings into the child's stdin.
//! - [`multiplexer`] owns one launch: it merges the readers, the feeder and
//!   termination into a [`TaskStream`] and tears everything down exactly once.

pub mod decode;
pub mod multiplexer;
pub mod process;
pub mod reader;
pub mod stdin;

pub use multiplexer::{TaskStream, spawn_multiplexer};
pub use process::{LaunchSpec, ProcessHandle, Termination};
pub use stdin::StdinSource;
