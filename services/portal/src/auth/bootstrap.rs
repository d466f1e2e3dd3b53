//! Startup provisioning of the first administrator.
//!
//! Registration only ever grants `public`, so without this nobody could hold
//! `user_admin`. When configured, the admin account is created with every
//! privileged role, or has those roles restored if it already exists. Its
//! password is only set at creation.
use crate::auth::password::{PasswordError, hash_password};
use crate::config::BootstrapAdmin;
use crate::model::{UserRecord, normalize_email};
use crate::store::{PortalStore, StoreError};
use chrono::Utc;
use tessera_authz::{RoleSet, UserId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Password(#[from] PasswordError),
}

pub async fn ensure_admin(
    store: &dyn PortalStore,
    admin: &BootstrapAdmin,
) -> Result<UserRecord, BootstrapError> {
    let email = normalize_email(&admin.email);
    if let Some(mut existing) = store.find_user_by_email(&email).await? {
        let privileged = RoleSet::all_privileged();
        if privileged.iter().all(|role| existing.roles.contains(role)) {
            return Ok(existing);
        }
        for role in privileged.iter() {
            existing.roles.insert(role);
        }
        existing.updated_at = Utc::now();
        tracing::info!(user_id = %existing.id, "restored bootstrap admin roles");
        return Ok(store.update_user(existing).await?);
    }

    let password_hash = hash_password(admin.password.clone()).await?;
    let now = Utc::now();
    let user = store
        .create_user(UserRecord {
            id: UserId::new(),
            email,
            first_name: "Portal".to_string(),
            last_name: "Administrator".to_string(),
            middle_name: None,
            organization: None,
            department: None,
            roles: RoleSet::all_privileged(),
            password_hash,
            created_at: now,
            updated_at: now,
        })
        .await?;
    tracing::info!(user_id = %user.id, "created bootstrap admin");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryStore;
    use tessera_authz::Role;

    fn admin() -> BootstrapAdmin {
        BootstrapAdmin {
            email: "Root@Example.com".to_string(),
            password: "bootstrap-secret".to_string(),
        }
    }

    #[tokio::test]
    async fn creates_admin_with_every_privileged_role() {
        let store = InMemoryStore::new();
        let user = ensure_admin(&store, &admin()).await.expect("bootstrap");
        assert_eq!(user.email, "root@example.com");
        assert_eq!(user.roles, RoleSet::all_privileged());
        assert!(!user.roles.contains(Role::Public));
    }

    #[tokio::test]
    async fn second_run_is_idempotent() {
        let store = InMemoryStore::new();
        let first = ensure_admin(&store, &admin()).await.expect("first");
        let second = ensure_admin(&store, &admin()).await.expect("second");
        assert_eq!(first.id, second.id);
        assert_eq!(store.list_users().await.expect("users").len(), 1);
    }

    #[tokio::test]
    async fn demoted_admin_gets_roles_back() {
        let store = InMemoryStore::new();
        let mut user = ensure_admin(&store, &admin()).await.expect("bootstrap");
        user.roles = RoleSet::from_iter([Role::Public]);
        store.update_user(user.clone()).await.expect("demote");
        let restored = ensure_admin(&store, &admin()).await.expect("restore");
        assert!(restored.roles.contains(Role::UserAdmin));
        assert!(restored.roles.contains(Role::Public));
    }
}
