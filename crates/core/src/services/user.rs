//! User service.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use hasker_common::{AppError, AppResult, IdGenerator};
use hasker_db::{
    entities::{user, user_profile},
    repositories::{UserProfileRepository, UserRepository},
};
use sea_orm::{DatabaseConnection, Set, TransactionTrait};
use serde::Deserialize;
use tracing::info;
use validator::Validate;

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    db: Arc<DatabaseConnection>,
    user_repo: UserRepository,
    profile_repo: UserProfileRepository,
    id_gen: IdGenerator,
}

/// Input for signing up.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupInput {
    #[validate(length(min = 1, max = 128))]
    pub username: String,

    #[validate(length(min = 8, max = 128))]
    pub password: String,

    #[validate(email)]
    pub email: Option<String>,
}

/// Input for updating the current user's profile.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
    #[validate(email)]
    pub email: Option<String>,

    /// Email me when one of my questions gets an answer.
    pub send_email: Option<bool>,

    /// Empty string clears the avatar.
    #[validate(length(max = 2048))]
    pub avatar_url: Option<String>,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(
        db: Arc<DatabaseConnection>,
        user_repo: UserRepository,
        profile_repo: UserProfileRepository,
    ) -> Self {
        Self {
            db,
            user_repo,
            profile_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a user. The user and its profile are written together.
    pub async fn signup(&self, input: SignupInput) -> AppResult<user::Model> {
        input.validate()?;

        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::Conflict("Username already taken".to_string()));
        }
        if let Some(ref email) = input.email {
            if self.profile_repo.find_by_email(email).await?.is_some() {
                return Err(AppError::Conflict("Email already in use".to_string()));
            }
        }

        let password_hash = hash_password(&input.password)?;
        let user_id = self.id_gen.generate();

        let user_model = user::ActiveModel {
            id: Set(user_id.clone()),
            username: Set(input.username.clone()),
            username_lower: Set(input.username.to_lowercase()),
            token: Set(Some(self.id_gen.generate_token())),
            avatar_url: Set(None),
            created_at: Set(chrono::Utc::now().into()),
            updated_at: Set(None),
        };
        let profile_model = user_profile::ActiveModel {
            user_id: Set(user_id),
            password: Set(Some(password_hash)),
            email: Set(input.email),
            send_email: Set(false),
        };

        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let user = UserRepository::create_in(&txn, user_model).await?;
        UserProfileRepository::create_in(&txn, profile_model).await?;

        txn.commit()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        info!(user_id = %user.id, username = %user.username, "User signed up");

        Ok(user)
    }

    /// Authenticate a user by username and password.
    pub async fn signin(&self, username: &str, password: &str) -> AppResult<user::Model> {
        let user = self
            .user_repo
            .find_by_username(username)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let profile = self
            .profile_repo
            .find_by_user_id(&user.id)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let password_hash = profile.password.ok_or(AppError::Unauthorized)?;
        if !verify_password(password, &password_hash)? {
            return Err(AppError::Unauthorized);
        }

        Ok(user)
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Get a user together with their profile.
    pub async fn get_with_profile(
        &self,
        user_id: &str,
    ) -> AppResult<(user::Model, user_profile::Model)> {
        let user = self.user_repo.get_by_id(user_id).await?;
        let profile = self.profile_repo.get_by_user_id(user_id).await?;
        Ok((user, profile))
    }

    /// Update email, email alerts and avatar.
    ///
    /// Setting the current email again changes nothing; an email used by
    /// another user is a conflict.
    pub async fn update_profile(
        &self,
        user_id: &str,
        input: UpdateProfileInput,
    ) -> AppResult<(user::Model, user_profile::Model)> {
        input.validate()?;

        let (mut user, mut profile) = self.get_with_profile(user_id).await?;

        let new_email = input
            .email
            .filter(|email| profile.email.as_deref() != Some(email.as_str()));
        if let Some(ref email) = new_email {
            if let Some(owner) = self.profile_repo.find_by_email(email).await? {
                if owner.user_id != user_id {
                    return Err(AppError::Conflict("Email already in use".to_string()));
                }
            }
        }

        if new_email.is_some() || input.send_email.is_some() {
            let mut active: user_profile::ActiveModel = profile.into();
            if let Some(email) = new_email {
                active.email = Set(Some(email));
            }
            if let Some(send_email) = input.send_email {
                active.send_email = Set(send_email);
            }
            profile = self.profile_repo.update(active).await?;
        }

        if let Some(avatar_url) = input.avatar_url {
            let avatar_url = Some(avatar_url).filter(|url| !url.is_empty());
            if avatar_url != user.avatar_url {
                let mut active: user::ActiveModel = user.into();
                active.avatar_url = Set(avatar_url);
                active.updated_at = Set(Some(chrono::Utc::now().into()));
                user = self.user_repo.update(active).await?;
            }
        }

        Ok((user, profile))
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_user(id: &str, username: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            username: username.to_string(),
            username_lower: username.to_lowercase(),
            token: Some("test_token".to_string()),
            avatar_url: None,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    fn create_test_profile(user_id: &str, email: Option<&str>) -> user_profile::Model {
        user_profile::Model {
            user_id: user_id.to_string(),
            password: Some(hash_password("password123").unwrap()),
            email: email.map(ToString::to_string),
            send_email: false,
        }
    }

    fn empty_db() -> Arc<DatabaseConnection> {
        Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection())
    }

    fn create_test_service(
        txn_db: Arc<DatabaseConnection>,
        user_db: Arc<DatabaseConnection>,
        profile_db: Arc<DatabaseConnection>,
    ) -> UserService {
        UserService::new(
            txn_db,
            UserRepository::new(user_db),
            UserProfileRepository::new(profile_db),
        )
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(hash.starts_with("$argon2"));
        assert!(hash.len() > 50);
    }

    #[test]
    fn test_verify_password() {
        let hash = hash_password("test_password_123").unwrap();

        assert!(verify_password("test_password_123", &hash).unwrap());
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        let result = verify_password("test", "invalid_hash");
        assert!(result.is_err());
    }

    #[test]
    fn test_signup_input_validation() {
        let input = SignupInput {
            username: "a".repeat(200),
            password: "password123".to_string(),
            email: None,
        };
        assert!(input.validate().is_err());

        let input = SignupInput {
            username: "testuser".to_string(),
            password: "short".to_string(),
            email: None,
        };
        assert!(input.validate().is_err());

        let input = SignupInput {
            username: "testuser".to_string(),
            password: "password123".to_string(),
            email: Some("not-an-email".to_string()),
        };
        assert!(input.validate().is_err());

        let input = SignupInput {
            username: "testuser".to_string(),
            password: "password123".to_string(),
            email: Some("test@example.com".to_string()),
        };
        assert!(input.validate().is_ok());
    }

    #[tokio::test]
    async fn test_signup_creates_user_and_profile() {
        let user = create_test_user("u1", "alice");
        let txn_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_query_results([[create_test_profile("u1", None)]])
                .into_connection(),
        );
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = create_test_service(Arc::clone(&txn_db), user_db, empty_db());

        let created = service
            .signup(SignupInput {
                username: "alice".to_string(),
                password: "password123".to_string(),
                email: None,
            })
            .await
            .unwrap();
        assert_eq!(created.id, "u1");

        drop(service);
        let log = match Arc::try_unwrap(txn_db) {
            Ok(db) => format!("{:?}", db.into_transaction_log()),
            Err(_) => panic!("connection is still shared"),
        };
        assert!(log.contains(r#"INSERT INTO \"user\""#));
        assert!(log.contains(r#"INSERT INTO \"user_profile\""#));
        assert!(log.contains("COMMIT"));
    }

    #[tokio::test]
    async fn test_signup_username_taken() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u0", "Alice")]])
                .into_connection(),
        );
        let service = create_test_service(empty_db(), user_db, empty_db());

        let result = service
            .signup(SignupInput {
                username: "alice".to_string(),
                password: "password123".to_string(),
                email: None,
            })
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_signin() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", "alice")]])
                .append_query_results([[create_test_user("u1", "alice")]])
                .into_connection(),
        );
        let profile_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_profile("u1", None)]])
                .append_query_results([[create_test_profile("u1", None)]])
                .into_connection(),
        );
        let service = create_test_service(empty_db(), user_db, profile_db);

        let user = service.signin("alice", "password123").await.unwrap();
        assert_eq!(user.id, "u1");

        let result = service.signin("alice", "wrong_password").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authenticate_by_token_not_found() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let service = create_test_service(empty_db(), user_db, empty_db());

        let result = service.authenticate_by_token("invalid").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_update_profile_same_email_is_noop() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", "alice")]])
                .into_connection(),
        );
        let profile_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_profile("u1", Some("alice@example.com"))]])
                .into_connection(),
        );
        let service = create_test_service(empty_db(), user_db, profile_db);

        let (_, profile) = service
            .update_profile(
                "u1",
                UpdateProfileInput {
                    email: Some("alice@example.com".to_string()),
                    send_email: None,
                    avatar_url: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(profile.email.as_deref(), Some("alice@example.com"));
    }

    #[tokio::test]
    async fn test_update_profile_email_taken() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_user("u1", "alice")]])
                .into_connection(),
        );
        let profile_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_profile("u1", None)]])
                .append_query_results([[create_test_profile("u2", Some("bob@example.com"))]])
                .into_connection(),
        );
        let service = create_test_service(empty_db(), user_db, profile_db);

        let result = service
            .update_profile(
                "u1",
                UpdateProfileInput {
                    email: Some("bob@example.com".to_string()),
                    send_email: Some(true),
                    avatar_url: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
