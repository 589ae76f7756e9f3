//! Organization models and DTOs, re-exported from `myway-models`.

pub use myway_models::organizations::*;
