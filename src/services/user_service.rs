use crate::config::{AuthConfig, BootstrapAdmin};
use crate::models::user::{
    Role, User, UserLoginRequest, UserLoginResponse, UserProfile, UserRegistrationRequest,
};
use crate::utils::error::{AppError, AppResult};
use crate::utils::jwt;
use bcrypt::{hash, verify, DEFAULT_COST};
use rand::distributions::Alphanumeric;
use rand::Rng;
use sqlx::MySqlPool;
use validator::Validate;

#[derive(Clone)]
pub struct UserService {
    pool: MySqlPool,
    auth: AuthConfig,
}

impl UserService {
    pub fn new(pool: MySqlPool, auth: AuthConfig) -> Self {
        UserService { pool, auth }
    }

    // Register a new customer
    pub async fn register_user(&self, request: UserRegistrationRequest) -> AppResult<i32> {
        self.create_user(request, Role::User).await
    }

    // Create an account with the ADMIN role
    pub async fn create_admin(&self, request: UserRegistrationRequest) -> AppResult<i32> {
        self.create_user(request, Role::Admin).await
    }

    async fn create_user(&self, request: UserRegistrationRequest, role: Role) -> AppResult<i32> {
        request.validate()?;

        // Check if username already exists
        let existing_user = sqlx::query("SELECT id FROM users WHERE username = ?")
            .bind(&request.username)
            .fetch_optional(&self.pool)
            .await?;

        if existing_user.is_some() {
            return Err(AppError::Conflict("Username already exists".into()));
        }

        // Hash password
        let hashed_password = hash(request.password.as_bytes(), DEFAULT_COST)
            .map_err(|e| AppError::ValidationError(e.to_string()))?;

        let result = sqlx::query("INSERT INTO users (username, password, name, role) VALUES (?, ?, ?, ?)")
            .bind(&request.username)
            .bind(hashed_password)
            .bind(&request.name)
            .bind(role.to_string())
            .execute(&self.pool)
            .await?;

        let user_id = result.last_insert_id() as i32;
        tracing::info!(user_id, %role, "user registered");
        Ok(user_id)
    }

    // Login user
    pub async fn login_user(&self, request: UserLoginRequest) -> AppResult<UserLoginResponse> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, name, role FROM users WHERE username = ?",
        )
        .bind(&request.username)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid credentials".into()))?;

        // Verify password
        let password_matches = verify(request.password.as_bytes(), &user.password)
            .map_err(|e| AppError::AuthError(e.to_string()))?;

        if !password_matches {
            tracing::warn!(username = %request.username, "failed login");
            return Err(AppError::AuthError("Invalid credentials".into()));
        }

        let role = parse_role(&user.role)?;

        // Generate JWT token
        let token = jwt::generate_token(&self.auth, user.id, role)
            .map_err(|e| AppError::AuthError(e.to_string()))?;

        Ok(UserLoginResponse {
            token,
            user_id: user.id,
            role,
        })
    }

    pub async fn get_profile(&self, user_id: i32) -> AppResult<UserProfile> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username, password, name, role FROM users WHERE id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        Ok(UserProfile {
            id: user.id,
            role: parse_role(&user.role)?,
            username: user.username,
            name: user.name,
        })
    }

    /// Create the configured admin account unless the username is taken.
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> AppResult<()> {
        let existing = sqlx::query("SELECT id FROM users WHERE username = ?")
            .bind(&admin.username)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Ok(());
        }

        let password = match &admin.password {
            Some(password) => password.clone(),
            None => {
                let generated: String = rand::thread_rng()
                    .sample_iter(&Alphanumeric)
                    .take(20)
                    .map(char::from)
                    .collect();
                tracing::warn!(
                    username = %admin.username,
                    password = %generated,
                    "generated bootstrap admin password, change it after first login"
                );
                generated
            }
        };

        self.create_admin(UserRegistrationRequest {
            username: admin.username.clone(),
            password,
            name: "Administrator".to_string(),
        })
        .await?;
        Ok(())
    }
}

fn parse_role(raw: &str) -> AppResult<Role> {
    raw.parse()
        .map_err(|_| AppError::DatabaseError(format!("unknown role {}", raw)))
}
