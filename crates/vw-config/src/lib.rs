//! TOML config loading, global-to-per-chain defaulting, and validation,
//! grounded on `original_source/td2/types.go`'s `Config`/`validateConfig`.

mod load;
mod model;
mod validate;

pub use load::load;
pub use model::Config;
pub use validate::validate;
