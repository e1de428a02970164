//! A dispatch interpreter for a register-oriented, actor-style bytecode
//! language: a fetch/decode/execute loop over a strand-scheduled `VMState`,
//! with the surrounding compiler, object system, primitive table, and I/O
//! layer treated as external collaborators a host links in.
//!
//! Start at [`state::VMState`] for the execution record, [`dispatch::run`]
//! for the main loop, and [`opcode::Op`] for the instruction set.

pub mod code;
pub mod config;
pub mod ctxt;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod flags;
pub mod global_env;
pub mod handlers;
pub mod location;
pub mod monitor;
pub mod ob;
pub mod opcode;
pub mod prim;
pub mod scheduler;
pub mod state;
pub mod stdoprn;

pub use config::{VmConfig, VmErrorPolicy};
pub use error::RblError;
pub use ob::Ob;
pub use opcode::Op;
pub use state::VMState;
