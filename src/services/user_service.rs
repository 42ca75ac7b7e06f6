use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use uuid::Uuid;
use validator::Validate;

use crate::errors::{AppError, AppResult, DbContext};
use crate::models::dto::{
    LoginRequest, LoginResponse, PageRequest, Paginated, RegisterRequest, UpdatePasswordRequest,
    UpdateProfileRequest, UserResponse,
};
use crate::models::users::{self, Role};
use crate::repositories::{AddressRepository, NewUser, UserRepository};
use crate::services::mail::Mailer;
use crate::utils::jwt::JwtKeys;
use crate::utils::password;

/// Durée de validité d'un lien de réinitialisation
pub const RESET_TOKEN_TTL_MINUTES: i64 = 60;

pub struct UserService {
    users: Arc<dyn UserRepository>,
    addresses: Arc<dyn AddressRepository>,
    jwt: JwtKeys,
    mailer: Arc<dyn Mailer>,
    frontend_url: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required_name(value: Option<&String>, field: &str) -> AppResult<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(format!("{} is required", field)))
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        addresses: Arc<dyn AddressRepository>,
        jwt: JwtKeys,
        mailer: Arc<dyn Mailer>,
        frontend_url: impl Into<String>,
    ) -> Self {
        Self {
            users,
            addresses,
            jwt,
            mailer,
            frontend_url: frontend_url.into(),
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> AppResult<UserResponse> {
        req.validate()?;

        let email = normalize_email(&req.email);
        let first_name = required_name(req.first_name.as_ref(), "first_name")?;
        let last_name = required_name(req.last_name.as_ref(), "last_name")?;
        // Inscription publique: toujours "user", le rôle admin passe par PUT /admin/user/{id}
        if let Some(value) = req.role.as_deref().filter(|r| !r.trim().is_empty()) {
            match Role::parse(value) {
                Some(Role::User) => {}
                Some(Role::Admin) => return Err(AppError::forbidden("Role cannot be assigned at registration")),
                None => return Err(AppError::validation(format!("Invalid role: {}", value))),
            }
        }
        let role = Role::User;

        if self.users.email_exists(&email).await.context("Failed to check email")? {
            return Err(AppError::conflict("Email already exists"));
        }

        let password_hash = password::hash_password(&req.password)?;
        let user = self
            .users
            .create(NewUser {
                email,
                password_hash,
                role,
                first_name: Some(first_name),
                last_name: Some(last_name),
            })
            .await
            .context("Failed to create user")?;

        tracing::info!(user_id = user.id, role = role.as_str(), "✅ User registered");
        Ok(UserResponse::from_user(user, None))
    }

    pub async fn login(&self, req: LoginRequest) -> AppResult<LoginResponse> {
        req.validate()?;
        let invalid = || AppError::Unauthorized("Invalid email or password".into());

        let user = self
            .users
            .find_by_email(&normalize_email(&req.email))
            .await
            .context("Failed to load user")?
            .ok_or_else(invalid)?;

        if !password::verify_password(&req.password, &user.password_hash)? {
            tracing::warn!(user_id = user.id, "Login failed: wrong password");
            return Err(invalid());
        }

        let token = self.jwt.generate_token(user.id, &user.email, user.role)?;
        let default_address = self
            .addresses
            .find_default(user.id)
            .await
            .context("Failed to load default address")?;

        Ok(LoginResponse {
            user: UserResponse::from_user(user, default_address),
            token,
        })
    }

    async fn load(&self, id: i32) -> AppResult<users::Model> {
        self.users
            .find_by_id(id)
            .await
            .context("Failed to load user")?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    /// Profil avec l'adresse par défaut
    pub async fn get_by_id(&self, id: i32) -> AppResult<UserResponse> {
        let user = self.load(id).await?;
        let default_address = self
            .addresses
            .find_default(id)
            .await
            .context("Failed to load default address")?;
        Ok(UserResponse::from_user(user, default_address))
    }

    /// `allow_role` n'est vrai que pour la route admin
    pub async fn update_profile(
        &self,
        id: i32,
        req: UpdateProfileRequest,
        allow_role: bool,
    ) -> AppResult<UserResponse> {
        req.validate()?;
        let mut user = self.load(id).await?;

        let email = normalize_email(&req.email);
        if email != user.email {
            if self.users.email_exists(&email).await.context("Failed to check email")? {
                return Err(AppError::conflict("Email already exists"));
            }
            user.email = email;
        }

        user.first_name = Some(required_name(req.first_name.as_ref(), "first_name")?);
        user.last_name = Some(required_name(req.last_name.as_ref(), "last_name")?);

        if let Some(value) = req.role.as_deref().filter(|r| !r.is_empty()) {
            if !allow_role {
                return Err(AppError::forbidden("Role cannot be changed"));
            }
            user.role = Role::parse(value)
                .ok_or_else(|| AppError::validation(format!("Invalid role: {}", value)))?;
        }

        let user = self.users.update(user).await.context("Failed to update user")?;
        let default_address = self
            .addresses
            .find_default(id)
            .await
            .context("Failed to load default address")?;
        Ok(UserResponse::from_user(user, default_address))
    }

    pub async fn update_password(&self, id: i32, req: UpdatePasswordRequest) -> AppResult<()> {
        req.validate()?;
        let mut user = self.load(id).await?;

        if !password::verify_password(&req.old_password, &user.password_hash)? {
            return Err(AppError::validation("Old password is incorrect"));
        }

        user.password_hash = password::hash_password(&req.new_password)?;
        self.users.update(user).await.context("Failed to update password")?;
        Ok(())
    }

    pub async fn delete(&self, id: i32) -> AppResult<()> {
        self.load(id).await?;
        self.users.soft_delete(id).await.context("Failed to delete user")?;
        tracing::info!(user_id = id, "🗑️ User deleted");
        Ok(())
    }

    pub async fn get_all(&self, page: &PageRequest) -> AppResult<Paginated<UserResponse>> {
        let (list, total) = self.users.list(page).await.context("Failed to list users")?;
        let items = list
            .into_iter()
            .map(|user| UserResponse::from_user(user, None))
            .collect();
        Ok(Paginated::new(items, total, page))
    }

    /// Génère un token à usage unique (1h) et envoie le lien par email
    pub async fn send_reset_password_email(&self, email: &str) -> AppResult<()> {
        let user = self
            .users
            .find_by_email(&normalize_email(email))
            .await
            .context("Failed to load user")?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let token = Uuid::new_v4().to_string();
        let expires_at = Utc::now() + Duration::minutes(RESET_TOKEN_TTL_MINUTES);
        self.users
            .save_reset_token(user.id, &token, expires_at)
            .await
            .context("Failed to save reset token")?;

        let link = format!(
            "{}/reset-password?token={}",
            self.frontend_url.trim_end_matches('/'),
            token
        );
        let body = format!(
            "Click the link below to reset your password:\n\n{}\n\nThis link expires in 1 hour.",
            link
        );

        self.mailer
            .send(&user.email, "Reset your password", &body)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to send reset email: {}", e)))?;

        tracing::info!(user_id = user.id, "📧 Reset password email sent");
        Ok(())
    }

    pub async fn reset_password(&self, token: &str, new_password: &str) -> AppResult<()> {
        let invalid = || AppError::validation("Invalid or expired token");

        let reset = self
            .users
            .find_reset_token(token)
            .await
            .context("Failed to load reset token")?
            .ok_or_else(invalid)?;

        if reset.is_expired(Utc::now()) {
            self.users
                .delete_reset_token(token)
                .await
                .context("Failed to delete reset token")?;
            return Err(invalid());
        }

        let mut user = self.load(reset.user_id).await?;
        user.password_hash = password::hash_password(new_password)?;
        self.users.update(user).await.context("Failed to update password")?;
        self.users
            .delete_reset_token(token)
            .await
            .context("Failed to delete reset token")?;

        tracing::info!(user_id = reset.user_id, "🔑 Password reset");
        Ok(())
    }
}

/// Tâche de fond: loggue le nombre d'utilisateurs actifs toutes les 10 secondes
pub fn spawn_user_count_logger(users: Arc<dyn UserRepository>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(StdDuration::from_secs(10));
        loop {
            interval.tick().await;
            match users.count_active().await {
                Ok(count) => tracing::info!(count, "👥 Active users"),
                Err(e) => tracing::error!(error = %e, "Failed to count users"),
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dto::ResetPasswordRequest;
    use crate::repositories::memory::MemoryStore;
    use crate::repositories::NewAddress;
    use crate::services::mail::testing::RecordingMailer;

    fn service(store: &MemoryStore, mailer: Arc<RecordingMailer>) -> UserService {
        UserService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            JwtKeys::new("test-secret"),
            mailer,
            "http://shop.test/",
        )
    }

    fn register_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: "secret123".to_string(),
            role: None,
            first_name: Some("Jane".to_string()),
            last_name: Some("Doe".to_string()),
        }
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let svc = service(&store, Arc::new(RecordingMailer::default()));

        let user = svc.register(register_request(" Jane@Example.com ")).await.unwrap();
        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.role, Role::User);

        let login = svc
            .login(LoginRequest {
                email: "jane@example.com".into(),
                password: "secret123".into(),
            })
            .await
            .unwrap();
        let claims = JwtKeys::new("test-secret").verify_token(&login.token).unwrap();
        assert_eq!(claims.user_id, user.id);
        assert_eq!(claims.role, "user");
    }

    #[tokio::test]
    async fn test_register_rejects_duplicate_and_missing_names() {
        let store = MemoryStore::new();
        let svc = service(&store, Arc::new(RecordingMailer::default()));
        svc.register(register_request("a@example.com")).await.unwrap();

        let err = svc.register(register_request("A@example.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let mut req = register_request("b@example.com");
        req.last_name = Some("  ".into());
        assert!(matches!(svc.register(req).await, Err(AppError::Validation(_))));

        let mut req = register_request("c@example.com");
        req.role = Some("root".into());
        assert!(matches!(svc.register(req).await, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_register_cannot_self_assign_admin() {
        let store = MemoryStore::new();
        let svc = service(&store, Arc::new(RecordingMailer::default()));

        let mut req = register_request("sneaky@example.com");
        req.role = Some("admin".into());
        assert!(matches!(svc.register(req).await, Err(AppError::Forbidden(_))));
        assert!(store.read(|data| data.users.is_empty()));

        let mut req = register_request("plain@example.com");
        req.role = Some("user".into());
        assert_eq!(svc.register(req).await.unwrap().role, Role::User);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let store = MemoryStore::new();
        let svc = service(&store, Arc::new(RecordingMailer::default()));
        svc.register(register_request("a@example.com")).await.unwrap();

        let err = svc
            .login(LoginRequest {
                email: "a@example.com".into(),
                password: "nope-nope".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_get_by_id_includes_default_address() {
        let store = MemoryStore::new();
        let svc = service(&store, Arc::new(RecordingMailer::default()));
        let user = svc.register(register_request("a@example.com")).await.unwrap();

        AddressRepository::create(
            &store,
            NewAddress {
                user_id: user.id,
                full_name: "Jane Doe".into(),
                phone: String::new(),
                address_line1: "1 Main St".into(),
                address_line2: String::new(),
                city: "Bangkok".into(),
                province: String::new(),
                zip_code: String::new(),
                country: "Thailand".into(),
                is_default: true,
            },
        )
        .await
        .unwrap();

        let profile = svc.get_by_id(user.id).await.unwrap();
        assert_eq!(profile.default_address.map(|a| a.city), Some("Bangkok".to_string()));
    }

    #[tokio::test]
    async fn test_update_profile_role_only_for_admin_route() {
        let store = MemoryStore::new();
        let svc = service(&store, Arc::new(RecordingMailer::default()));
        let user = svc.register(register_request("a@example.com")).await.unwrap();

        let req = || UpdateProfileRequest {
            first_name: Some("Janet".into()),
            last_name: Some("Doe".into()),
            email: "a@example.com".into(),
            role: Some("admin".into()),
        };

        let err = svc.update_profile(user.id, req(), false).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let updated = svc.update_profile(user.id, req(), true).await.unwrap();
        assert_eq!(updated.role, Role::Admin);
        assert_eq!(updated.first_name.as_deref(), Some("Janet"));
    }

    #[tokio::test]
    async fn test_update_password_requires_old_password() {
        let store = MemoryStore::new();
        let svc = service(&store, Arc::new(RecordingMailer::default()));
        let user = svc.register(register_request("a@example.com")).await.unwrap();

        let err = svc
            .update_password(
                user.id,
                UpdatePasswordRequest {
                    old_password: "wrong-one".into(),
                    new_password: "another1".into(),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        svc.update_password(
            user.id,
            UpdatePasswordRequest {
                old_password: "secret123".into(),
                new_password: "another1".into(),
            },
        )
        .await
        .unwrap();
        svc.login(LoginRequest {
            email: "a@example.com".into(),
            password: "another1".into(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_deleted_user_is_hidden() {
        let store = MemoryStore::new();
        let svc = service(&store, Arc::new(RecordingMailer::default()));
        let user = svc.register(register_request("a@example.com")).await.unwrap();

        svc.delete(user.id).await.unwrap();
        assert!(matches!(svc.get_by_id(user.id).await, Err(AppError::NotFound(_))));

        let page = PageRequest::new(None, None, None, None);
        assert_eq!(svc.get_all(&page).await.unwrap().total_items, 0);
    }

    #[tokio::test]
    async fn test_reset_password_flow() {
        let store = MemoryStore::new();
        let mailer = Arc::new(RecordingMailer::default());
        let svc = service(&store, mailer.clone());
        svc.register(register_request("a@example.com")).await.unwrap();

        svc.send_reset_password_email("a@example.com").await.unwrap();
        let token = store.read(|data| data.reset_tokens[0].token.clone());

        let sent = mailer.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "a@example.com");
        assert!(sent[0].2.contains(&format!("http://shop.test/reset-password?token={}", token)));

        let req = ResetPasswordRequest {
            token: token.clone(),
            new_password: "brand-new".into(),
        };
        svc.reset_password(&req.token, &req.new_password).await.unwrap();
        svc.login(LoginRequest {
            email: "a@example.com".into(),
            password: "brand-new".into(),
        })
        .await
        .unwrap();

        // Usage unique
        let err = svc.reset_password(&token, "again-new").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn test_expired_reset_token_is_rejected_and_removed() {
        let store = MemoryStore::new();
        let svc = service(&store, Arc::new(RecordingMailer::default()));
        let user = svc.register(register_request("a@example.com")).await.unwrap();

        UserRepository::save_reset_token(&store, user.id, "old", Utc::now() - Duration::minutes(1))
            .await
            .unwrap();

        let err = svc.reset_password("old", "brand-new").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.read(|data| data.reset_tokens.is_empty()));
    }

    #[tokio::test]
    async fn test_forgot_password_unknown_email() {
        let store = MemoryStore::new();
        let svc = service(&store, Arc::new(RecordingMailer::default()));
        let err = svc.send_reset_password_email("ghost@example.com").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
