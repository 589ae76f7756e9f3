//! Thread and reply models, re-exported from `myway-models`.

pub use myway_models::discussions::*;
