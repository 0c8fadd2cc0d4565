// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde_json::json;

use crate::{
    common::error::AppError,
    db::{
        repository::Repository,
        store::Filter,
    },
    models::auth::{Claims, ConsumerUser, Role, StaffUser, User, UserType},
};

const TOKEN_TTL_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    staff: Repository<StaffUser>,
    consumers: Repository<ConsumerUser>,
    jwt_secret: String,
}

/// bcrypt is CPU bound; keep it off the async workers.
pub async fn hash_password(password: &str) -> Result<String, AppError> {
    let password = password.to_owned();
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("hashing task failed: {}", e))??;
    Ok(hashed)
}

async fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    let password = password.to_owned();
    let password_hash = password_hash.to_owned();
    let valid = tokio::task::spawn_blocking(move || verify(&password, &password_hash))
        .await
        .map_err(|e| anyhow::anyhow!("password verification task failed: {}", e))??;
    Ok(valid)
}

impl AuthService {
    pub fn new(staff: Repository<StaffUser>, consumers: Repository<ConsumerUser>, jwt_secret: String) -> Self {
        Self { staff, consumers, jwt_secret }
    }

    /// Finds an account by e-mail across both user collections (staff first).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let email = email.trim().to_lowercase();

        if let Some(staff) = self.staff.find_one(Filter::new().eq("email", email.clone())).await? {
            return Ok(Some(staff.into()));
        }
        let consumer = self.consumers.find_one(Filter::new().eq("email", email)).await?;
        Ok(consumer.map(User::from))
    }

    pub async fn login_user(&self, email: &str, password: &str) -> Result<(String, User), AppError> {
        let user = self
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if !verify_password(password, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }
        if !user.active {
            tracing::warn!("login attempt for deactivated account {}", user.id);
            return Err(AppError::InvalidCredentials);
        }

        let token = self.create_token(&user)?;
        Ok((token, user))
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;

        let claims = token_data.claims;
        // Always reload: deleted or deactivated accounts lose access immediately.
        let user: Option<User> = match claims.user_type {
            UserType::Staff => self.staff.get(claims.sub).await?.map(User::from),
            UserType::Consumer => self.consumers.get(claims.sub).await?.map(User::from),
        };

        match user {
            Some(user) if user.active => Ok(user),
            _ => Err(AppError::InvalidToken),
        }
    }

    pub async fn change_password(&self, user: &User, current: &str, new_password: &str) -> Result<(), AppError> {
        if !verify_password(current, &user.password_hash).await? {
            return Err(AppError::InvalidCredentials);
        }
        let new_hash = hash_password(new_password).await?;

        let mut fields = serde_json::Map::new();
        fields.insert("passwordHash".into(), json!(new_hash));

        let updated = match user.user_type {
            UserType::Staff => self.staff.update(user.id, fields).await?.is_some(),
            UserType::Consumer => self.consumers.update(user.id, fields).await?.is_some(),
        };
        if !updated {
            return Err(AppError::NotFound("user"));
        }
        Ok(())
    }

    pub fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_TTL_DAYS);

        let claims = Claims {
            sub: user.id,
            role: user.role,
            user_type: user.user_type,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}

/// Fails with `Forbidden` unless the user holds one of the roles.
pub fn require_role(user: &User, roles: &[Role]) -> Result<(), AppError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}
