//! # CLI Command Implementations
//!
//! One module per subcommand of `extension-lock`. Each module defines an
//! `Args` struct derived with `clap` and an `execute` function that loads the
//! input files, wires the concrete collaborators together and calls into the
//! `extension_lock` library.

pub mod lock;
pub mod ls;
pub mod upgrade;
