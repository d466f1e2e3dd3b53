//! Portal authentication and request gating.
//!
//! # Purpose
//! Session token minting/verification, password hashing, resolution of a
//! request to an [`tessera_authz::Identity`], and the route-level gate that
//! composes identity resolution with the role policy.
pub mod bootstrap;
pub mod gate;
pub mod identity;
pub mod keys;
pub mod password;
pub mod session;
