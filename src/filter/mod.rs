//! Class-name admission filter
//!
//! Decides, before a payload is unmarshalled, whether a fully-qualified class
//! name may be resolved. The policy is written as a filter specification.
//!
//! # Syntax
//!
//! ```text
//! element (";" element)*
//! ```
//!
//! Each element is an optional `!` reject marker followed by one of:
//!
//! - `a.b.C`    exactly this class
//! - `a.b.*`    classes directly in package `a.b`
//! - `a.b.**`   classes in `a.b` and every sub-package
//! - `a.b.Pre*` any class name starting with `a.b.Pre` (`*` alone matches everything)
//!
//! `=` and `/` are reserved and rejected.
//!
//! # Evaluation
//!
//! A matching reject element always wins, wherever it is declared. If any
//! accept element exists the spec is an allowlist and classes nothing accepted
//! are rejected; otherwise it is a blocklist and everything not rejected is
//! admitted. The empty spec admits everything.
//!
//! # Examples
//!
//! ```text
//! !org.example.Gadget                 # block one class, admit the rest
//! com.acme.api.*;com.acme.model.**    # admit only these packages
//! com.acme.**;!com.acme.internal.**   # admit com.acme except internals
//! ```

pub mod defaults;
pub mod error;
pub mod matcher;
pub mod parser;

pub use defaults::{CLIENT_SUPPORT_PACKAGE, DEFAULT_SPEC};
pub use error::{FilterError, FilterSpecError};
pub use matcher::{
    Decision, DecisionReason, apply, evaluate, filter_warnings, print_filter_warnings,
};
pub use parser::{CompileOptions, FilterSpec, MatchKind, Mode, Polarity, Rule};
