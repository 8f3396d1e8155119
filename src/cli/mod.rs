//! # CLI Module
//!
//! Command-line surface of the `apiforge` binary.
//!
//! ## Commands
//!
//! ### `examples`
//!
//! ```bash
//! apiforge examples                        # one line per built-in spec
//! apiforge examples --name user_management # print it as JSON
//! ```
//!
//! ### `validate`
//!
//! ```bash
//! apiforge validate --spec api.yaml
//! ```
//!
//! ### `generate`
//!
//! ```bash
//! apiforge generate --spec api.json --output my-api
//! apiforge generate --spec api.json --output my-api --force --enhance
//! apiforge generate --spec api.json --output my-api --mode fully_ai
//! ```
//!
//! Options:
//! - `--spec <FILE>` - specification, JSON or YAML (required)
//! - `--output <DIR>` - output directory (required)
//! - `--force` - overwrite existing files
//! - `--dry-run` - list the files without writing them
//! - `--enhance` - run the AI review pass first; failures fall back to the baseline
//! - `--mode <MODE>` - `template` (default), `ai_assisted` (review pass) or
//!   `fully_ai` (generated handler bodies, then the review pass)
//!
//! ### `describe`
//!
//! ```bash
//! apiforge describe "A lending library with members and loans" --domain education --out library.json
//! ```
//!
//! ### `status`
//!
//! Prints whether the AI features can run, as JSON.
//!
//! ## Global options
//!
//! - `--config <FILE>` - configuration file (default: `./apiforge.toml` if present)
//! - `--verbose` - debug logging
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use apiforge::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse()).await?;
//! ```

mod commands;


pub use commands::{run_cli, Cli, Commands, Complexity};
