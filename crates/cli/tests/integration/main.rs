//! CLI integration tests.
//!
//! These drive the `varbuild` binary against a throwaway source tree compiled
//! with a shell-script stand-in for the Fortran compiler.

#![cfg(unix)]

mod arch_tests;
mod build_tests;
mod clean_tests;
mod common;
mod describe_tests;
