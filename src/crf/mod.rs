//! Linear-chain CRF inference (`spec.md` §4.E, §4.F).

pub mod context;
pub mod model;

pub use context::CrfContext;
pub use model::Crf;
