//! Registration and login.
//!
//! Registration always grants `{public}`; elevated roles come from a
//! `user_admin` or the bootstrap admin. Login answers 401 for an unknown
//! email and a wrong password alike.
use crate::api::error::{
    ApiError, api_conflict, api_internal, api_internal_message, api_unauthorized,
};
use crate::api::types::{LoginRequest, LoginResponse, RegisterRequest};
use crate::api::validation::{Issues, parse_json};
use crate::app::AppState;
use crate::auth::password::{self, PasswordError};
use crate::model::{User, UserRecord, normalize_email};
use crate::store::StoreError;
use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::Utc;
use tessera_authz::{Role, RoleSet, UserId};

pub(crate) fn validate_email(issues: &mut Issues, email: &str) {
    let email = email.trim();
    let plausible = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    issues.check(plausible, "email", "must be a valid email address");
}

pub(crate) fn validate_new_password(issues: &mut Issues, field: &str, password: &str) {
    if let Err(err) = password::check_policy(password) {
        issues.push(field, err.to_string());
    }
}

pub(crate) fn password_failure(err: PasswordError) -> ApiError {
    tracing::error!(error = %err, "password hashing failed");
    api_internal_message("password hashing failed")
}

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = User),
        (status = 400, description = "Invalid input", body = crate::api::types::ErrorResponse),
        (status = 409, description = "Email already registered", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn register(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let request: RegisterRequest = parse_json(&body)?;
    let mut issues = Issues::new();
    validate_email(&mut issues, &request.email);
    issues.non_empty("firstName", &request.first_name);
    issues.non_empty("lastName", &request.last_name);
    validate_new_password(&mut issues, "password", &request.password);
    issues.finish()?;

    let password_hash = password::hash_password(request.password)
        .await
        .map_err(password_failure)?;
    let now = Utc::now();
    let record = UserRecord {
        id: UserId::new(),
        email: normalize_email(&request.email),
        first_name: request.first_name.trim().to_string(),
        last_name: request.last_name.trim().to_string(),
        middle_name: request.middle_name,
        organization: request.organization,
        department: request.department,
        roles: RoleSet::from_iter([Role::Public]),
        password_hash,
        created_at: now,
        updated_at: now,
    };
    match state.store.create_user(record).await {
        Ok(user) => {
            tracing::info!(user_id = %user.id, "registered user");
            Ok((StatusCode::CREATED, Json(user.view())))
        }
        Err(StoreError::Conflict(_)) => Err(api_conflict("email already registered")),
        Err(err) => Err(api_internal("failed to create user", &err)),
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued", body = LoginResponse),
        (status = 401, description = "Bad credentials", body = crate::api::types::ErrorResponse)
    )
)]
pub(crate) async fn login(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<LoginResponse>, ApiError> {
    let request: LoginRequest = parse_json(&body)?;
    let found = state
        .store
        .find_user_by_email(&normalize_email(&request.email))
        .await
        .map_err(|err| api_internal("failed to look up user", &err))?;
    let Some(user) = found else {
        password::reject_absent_account(request.password)
            .await
            .map_err(password_failure)?;
        return Err(api_unauthorized());
    };
    let matches = password::verify_password(request.password, user.password_hash.clone())
        .await
        .map_err(password_failure)?;
    if !matches {
        tracing::info!(user_id = %user.id, "login rejected");
        return Err(api_unauthorized());
    }
    let session = state.sessions.mint(&user.id).map_err(|err| {
        tracing::error!(error = %err, "failed to mint session");
        api_internal_message("failed to mint session")
    })?;
    Ok(Json(LoginResponse {
        token: session.token,
        expires_at: session.expires_at,
        user: user.view(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_is_checked() {
        for (email, ok) in [
            ("ada@example.com", true),
            ("  ada@example.com ", true),
            ("ada", false),
            ("@example.com", false),
            ("ada@localhost", false),
        ] {
            let mut issues = Issues::new();
            validate_email(&mut issues, email);
            assert_eq!(issues.is_empty(), ok, "{email}");
        }
    }

    #[test]
    fn short_password_is_a_field_issue() {
        let mut issues = Issues::new();
        validate_new_password(&mut issues, "newPassword", "short");
        let err = issues.finish().expect_err("short");
        assert_eq!(err.body.details.expect("details")[0].field, "newPassword");
    }
}
