// ABOUTME: Library root for caravel - exposes the deploy pipeline and its collaborators.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod confirm;
pub mod diagnostics;
pub mod error;
pub mod hooks;
pub mod output;
pub mod release;
pub mod remote;
pub mod ssh;
pub mod types;
pub mod upload;
pub mod vcs;
