//! Course, module, material and enrollment models, re-exported from
//! `myway-models`.

pub use myway_models::courses::*;
