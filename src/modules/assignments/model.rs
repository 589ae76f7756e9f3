//! Assignment and submission models, re-exported from `myway-models`.

pub use myway_models::assignments::*;
