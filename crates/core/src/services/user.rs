//! User service: registration, token login and profiles.

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use foodgram_common::{AppError, AppResult, IdGenerator};
use foodgram_db::{
    Page,
    entities::user,
    repositories::{FollowRepository, UserRepository},
};
use regex::Regex;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Usernames reserved for routing (`/users/me`).
const RESERVED_USERNAMES: &[&str] = &["me"];

static USERNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"^[\w.@+-]+$").unwrap()
});

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(email, length(max = 254))]
    pub email: String,

    #[validate(length(min = 1, max = 150), custom(function = validate_username))]
    pub username: String,

    #[validate(length(min = 1, max = 150))]
    pub first_name: String,

    #[validate(length(min = 1, max = 150))]
    pub last_name: String,

    #[validate(length(min = 8, max = 150))]
    pub password: String,
}

/// Credentials exchanged for an access token.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,

    #[validate(length(min = 1))]
    pub password: String,
}

/// Input for changing the acting user's password.
#[derive(Debug, Deserialize, Validate)]
pub struct SetPasswordInput {
    #[validate(length(min = 8, max = 150))]
    pub new_password: String,

    pub current_password: String,
}

/// Public representation of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    /// Whether the viewer follows this user.
    pub is_subscribed: bool,
}

impl UserView {
    /// Build a view from a user row.
    #[must_use]
    pub fn new(user: user::Model, is_subscribed: bool) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
            is_subscribed,
        }
    }
}

fn validate_username(username: &str) -> Result<(), ValidationError> {
    if RESERVED_USERNAMES.contains(&username) {
        return Err(ValidationError::new("reserved_username")
            .with_message(format!("Username '{username}' is reserved").into()));
    }
    if !USERNAME_RE.is_match(username) {
        return Err(ValidationError::new("invalid_username")
            .with_message("Username may only contain letters, digits and @/./+/-/_".into()));
    }
    Ok(())
}

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    follow_repo: FollowRepository,
    id_gen: IdGenerator,
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, follow_repo: FollowRepository) -> Self {
        Self {
            user_repo,
            follow_repo,
            id_gen: IdGenerator::new(),
        }
    }

    /// Register a new user.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::BadRequest(
                "A user with this email already exists".to_string(),
            ));
        }
        if self
            .user_repo
            .find_by_username(&input.username)
            .await?
            .is_some()
        {
            return Err(AppError::BadRequest("Username already taken".to_string()));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(input.email),
            username: Set(input.username),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            password: Set(password_hash),
            token: Set(None),
            created_at: Set(chrono::Utc::now().into()),
        };

        let user = self.user_repo.create(model).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "User registered");
        Ok(user)
    }

    /// Exchange email and password for an access token.
    ///
    /// A user who is already logged in gets the existing token back.
    pub async fn login(&self, input: LoginInput) -> AppResult<String> {
        input.validate()?;

        let user = self
            .user_repo
            .find_by_email(&input.email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        if !verify_password(&input.password, &user.password)? {
            return Err(AppError::Unauthorized);
        }

        if let Some(token) = user.token.clone() {
            return Ok(token);
        }

        let token = self.id_gen.generate_token();
        let mut active: user::ActiveModel = user.into();
        active.token = Set(Some(token.clone()));
        self.user_repo.update(active).await?;

        Ok(token)
    }

    /// Revoke the acting user's token.
    pub async fn logout(&self, user: user::Model) -> AppResult<()> {
        let mut active: user::ActiveModel = user.into();
        active.token = Set(None);
        self.user_repo.update(active).await?;
        Ok(())
    }

    /// Change the acting user's password after checking the current one.
    pub async fn set_password(&self, user: user::Model, input: SetPasswordInput) -> AppResult<()> {
        input.validate()?;

        if !verify_password(&input.current_password, &user.password)? {
            return Err(AppError::BadRequest(
                "Current password is incorrect".to_string(),
            ));
        }

        let mut active: user::ActiveModel = user.into();
        active.password = Set(hash_password(&input.new_password)?);
        self.user_repo.update(active).await?;
        Ok(())
    }

    /// Resolve the user owning `token`.
    pub async fn authenticate(&self, token: &str) -> AppResult<Option<user::Model>> {
        self.user_repo.find_by_token(token).await
    }

    /// Get a user by ID as seen by `viewer`.
    pub async fn get(&self, viewer: Option<&user::Model>, id: &str) -> AppResult<UserView> {
        let user = self.user_repo.get_by_id(id).await?;
        let is_subscribed = match viewer {
            Some(viewer) => self.follow_repo.is_following(&viewer.id, &user.id).await?,
            None => false,
        };
        Ok(UserView::new(user, is_subscribed))
    }

    /// List users as seen by `viewer`, optionally those whose username
    /// contains `search`.
    pub async fn list(
        &self,
        viewer: Option<&user::Model>,
        search: Option<&str>,
        offset: u64,
        limit: u64,
    ) -> AppResult<Page<UserView>> {
        let page = self
            .user_repo
            .list(search.map(str::trim), offset, limit)
            .await?;

        let followed = match viewer {
            Some(viewer) => {
                let ids: Vec<String> = page.items.iter().map(|u| u.id.clone()).collect();
                self.follow_repo.followed_among(&viewer.id, &ids).await?
            }
            None => Default::default(),
        };

        Ok(Page {
            items: page
                .items
                .into_iter()
                .map(|u| {
                    let is_subscribed = followed.contains(&u.id);
                    UserView::new(u, is_subscribed)
                })
                .collect(),
            total: page.total,
        })
    }
}

/// Hash a password with argon2.
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
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn create_test_user(id: &str, password: &str, token: Option<&str>) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            username: id.to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            password: hash_password(password).unwrap(),
            token: token.map(str::to_string),
            created_at: Utc::now().into(),
        }
    }

    fn service(user_db: MockDatabase) -> UserService {
        let follow_db = Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        UserService::new(
            UserRepository::new(Arc::new(user_db.into_connection())),
            FollowRepository::new(follow_db),
        )
    }

    fn register_input(username: &str) -> RegisterInput {
        RegisterInput {
            email: "new@example.com".to_string(),
            username: username.to_string(),
            first_name: "New".to_string(),
            last_name: "User".to_string(),
            password: "correct-horse".to_string(),
        }
    }

    #[test]
    fn test_password_hash_round_trip() {
        let hash = hash_password("secret-password").unwrap();
        assert!(verify_password("secret-password", &hash).unwrap());
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_username_rules() {
        assert!(validate_username("me").is_err());
        assert!(validate_username("bad name").is_err());
        assert!(validate_username("chef.anna+1@home").is_ok());
    }

    #[tokio::test]
    async fn test_register_rejects_reserved_username() {
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service.register(register_input("me")).await;

        assert!(matches!(result, Err(AppError::Validation(msg)) if msg.contains("username")));
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_email() {
        let existing = create_test_user("taken", "password123", None);
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let result = service.register(register_input("fresh")).await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_login_reuses_existing_token() {
        let user = create_test_user("u1", "password123", Some("tok"));
        let service =
            service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let token = service
            .login(LoginInput {
                email: "u1@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(token, "tok");
    }

    #[tokio::test]
    async fn test_login_issues_token() {
        let user = create_test_user("u1", "password123", None);
        let mut updated = user.clone();
        updated.token = Some("0123456789abcdef0123456789abcdef".to_string());
        let service = service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_query_results([[updated]]),
        );

        let token = service
            .login(LoginInput {
                email: "u1@example.com".to_string(),
                password: "password123".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(token.len(), 32);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let user = create_test_user("u1", "password123", None);
        let service =
            service(MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]));

        let result = service
            .login(LoginInput {
                email: "u1@example.com".to_string(),
                password: "nope-nope".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_set_password_requires_current() {
        let user = create_test_user("u1", "password123", None);
        let service = service(MockDatabase::new(DatabaseBackend::Postgres));

        let result = service
            .set_password(
                user,
                SetPasswordInput {
                    new_password: "another-password".to_string(),
                    current_password: "not-it".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }
}
