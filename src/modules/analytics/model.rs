//! Analytics views, re-exported from `myway-models`.

pub use myway_models::analytics::*;
