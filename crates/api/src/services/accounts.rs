//! Account registration, password resets and role changes.
//!
//! Shared by the `/users` endpoints and the `ed-cli user` commands, so it
//! needs a pool but no token signer.
//!
//! Role and activation changes lock every active broker row before the
//! target row, so the last-broker check and the write see the same state.

use sqlx::PgPool;

use estate_desk_core::{Email, Role, UserId};

use crate::db::RepositoryError;
use crate::db::users::{self, UserRepository};
use crate::models::user::{NewUserInput, User};
use crate::services::auth::{AuthError, hash_password, validate_password};

/// Account service.
pub struct AccountService<'a> {
    pool: &'a PgPool,
    users: UserRepository<'a>,
}

impl<'a> AccountService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            users: UserRepository::new(pool),
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password doesn't meet
    /// requirements.
    /// Returns `AuthError::EmployeeRequired` for an advisor without an
    /// employee link.
    /// Returns `AuthError::EmailTaken` if the email is already registered.
    pub async fn register(&self, input: &NewUserInput) -> Result<User, AuthError> {
        validate_password(&input.password)?;
        if input.role == Role::Advisor && input.employee_id.is_none() {
            return Err(AuthError::EmployeeRequired);
        }

        let password_hash = hash_password(&input.password)?;

        self.users
            .create(&input.email, &password_hash, input.role, input.employee_id)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(message) if message.starts_with("email") => {
                    AuthError::EmailTaken
                }
                other => AuthError::Repository(other),
            })
    }

    /// Replace the password of the account registered under `email`.
    ///
    /// Existing tokens stay valid until they expire.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` if the password doesn't meet
    /// requirements, and `AuthError::Repository(NotFound)` for an unknown
    /// email.
    pub async fn reset_password(&self, email: &Email, password: &str) -> Result<UserId, AuthError> {
        validate_password(password)?;

        let user = self
            .users
            .get_by_email(email)
            .await?
            .ok_or(RepositoryError::NotFound("user"))?;

        let password_hash = hash_password(password)?;
        self.users.update_password_hash(user.id, &password_hash).await?;
        Ok(user.id)
    }

    /// Change an account's role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::EmployeeRequired` when making an unlinked account
    /// an advisor, `AuthError::LastBroker` when demoting the only active
    /// broker, and `AuthError::Repository(NotFound)` for an unknown id.
    pub async fn change_role(&self, id: UserId, role: Role) -> Result<User, AuthError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let brokers = users::lock_active_brokers(&mut tx).await?;
        let target = users::lock(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound("user"))?;

        if role == Role::Advisor && target.employee_id.is_none() {
            return Err(AuthError::EmployeeRequired);
        }
        if removes_last_broker(&target, role, target.active, &brokers) {
            return Err(AuthError::LastBroker);
        }

        let updated = users::update_role(&mut tx, id, role).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(user_id = %id, from = %target.role, to = %updated.role, "role changed");
        Ok(updated)
    }

    /// Activate or deactivate an account.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::LastBroker` when deactivating the only active
    /// broker, and `AuthError::Repository(NotFound)` for an unknown id.
    pub async fn set_active(&self, id: UserId, active: bool) -> Result<User, AuthError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        let brokers = users::lock_active_brokers(&mut tx).await?;
        let target = users::lock(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound("user"))?;

        if removes_last_broker(&target, target.role, active, &brokers) {
            return Err(AuthError::LastBroker);
        }

        let updated = users::set_active(&mut tx, id, active).await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(user_id = %id, active = updated.active, "account activation changed");
        Ok(updated)
    }
}

/// Whether moving `target` to (`role`, `active`) leaves no active broker
/// among `active_brokers`.
fn removes_last_broker(target: &User, role: Role, active: bool, active_brokers: &[UserId]) -> bool {
    let was_broker = target.role == Role::Broker && target.active;
    let stays_broker = role == Role::Broker && active;
    was_broker && !stays_broker && active_brokers.iter().all(|&b| b == target.id)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn account(id: i32, role: Role, active: bool) -> User {
        User {
            id: UserId::new(id),
            email: Email::parse(&format!("user{id}@example.com")).unwrap(),
            role,
            employee_id: None,
            active,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn test_only_broker_cannot_step_down() {
        let broker = account(1, Role::Broker, true);
        let brokers = [broker.id];

        assert!(removes_last_broker(&broker, Role::Secretary, true, &brokers));
        assert!(removes_last_broker(&broker, Role::Broker, false, &brokers));
        assert!(!removes_last_broker(&broker, Role::Broker, true, &brokers));
    }

    #[test]
    fn test_second_broker_allows_demotion() {
        let broker = account(1, Role::Broker, true);
        let brokers = [broker.id, UserId::new(2)];

        assert!(!removes_last_broker(&broker, Role::Advisor, true, &brokers));
        assert!(!removes_last_broker(&broker, Role::Broker, false, &brokers));
    }

    #[test]
    fn test_non_brokers_are_never_the_last_broker() {
        let secretary = account(3, Role::Secretary, true);
        assert!(!removes_last_broker(&secretary, Role::Advisor, false, &[]));

        // Already inactive, so nothing changes for the broker count.
        let retired = account(4, Role::Broker, false);
        assert!(!removes_last_broker(&retired, Role::Secretary, false, &[]));
    }
}
