use crate::RoleSet;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("Unauthorized")]
    Unauthenticated,
    #[error("Required role: {required}, but user has: {actual}")]
    Forbidden { required: RoleSet, actual: RoleSet },
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("invalid id: {0}")]
    InvalidId(String),
}

pub type AuthzResult<T> = Result<T, AuthzError>;
