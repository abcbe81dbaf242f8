//! Challenge scoring: point decay, first blood, flag submission
//!
//! The decay engine is a set of pure functions over challenge reference
//! data; `SolveService` applies them when pricing accepted flags.

pub mod decay;
pub mod service;

pub use decay::*;
pub use service::SolveService;
