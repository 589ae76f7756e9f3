//! Study pack, practice and tutor models, re-exported from `myway-models`.

pub use myway_models::study_packs::*;
