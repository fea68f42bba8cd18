//! One-shot maintenance bot for extension repositories.
//!
//! The bot reads a tracking issue for a list of repositories, clones each one,
//! applies a small mechanical patch, bumps the manifest version and opens (or
//! updates) a pull request through `gh`. Repositories are processed strictly
//! one at a time.
//!
//! - **[`core`]**: Pure logic (page parsing, semver bumps, manifest porting).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting adapters (`git`, `gh`, HTTP, filesystem,
//!   child processes). The [`io::gh::Hosting`] and [`io::git::Vcs`] traits are
//!   the seams tests replace with scripted fakes.
//! - **[`patch`]**: The patch appliers and the repository-level version bumper.
//!
//! Orchestration modules ([`publish`], [`pipeline`], [`retry`]) compose these
//! into the per-repository run driven by the CLI.

pub mod core;
pub mod io;
pub mod logging;
pub mod patch;
pub mod pipeline;
pub mod publish;
pub mod retry;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
