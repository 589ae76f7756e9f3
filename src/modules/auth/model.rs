//! Registration, login and token DTOs.
//!
//! Re-exported from `myway-models`, where the user entities also live.

pub use myway_models::users::{
    LoginRequest, LoginResponse, RefreshTokenRequest, RegisterRequestDto, User, UserMembership,
    UserWithMemberships,
};
