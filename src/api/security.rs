use std::{collections::HashMap, sync::Mutex};

use actix_web::{FromRequest, HttpRequest};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    config::AdminUser,
};

#[derive(Debug, Serialize, Deserialize)]
struct Claim {
    sub: String,
    iat: usize,
    exp: usize,
    jti: String,
}

/**
 * An authenticated admin session.
 */
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub email: String,
    pub token_id: String,
    pub expires_at: DateTime<Utc>,
}

/**
 * Whether a request carries a valid session. Every authenticated user has full admin rights.
 */
#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Authenticated(Session),
    Unauthenticated,
}

/**
 * A token issued on sign in.
 */
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub session: Session,
}

/**
 * JWT Security Service for signing admins in and out and resolving their sessions.
 */
pub struct JwtSecurityService {
    /**
     * The key used to sign issued tokens.
     */
    encoding_key: EncodingKey,
    /**
     * The key used to verify JWT tokens.
     */
    decoding_key: DecodingKey,
    /**
     * The validation rules for JWT tokens.
     */
    validation: Validation,
    /**
     * Lifetime of issued tokens in seconds.
     */
    token_expiry_secs: u64,
    /**
     * Argon2 password hashes by lowercase email.
     */
    admin_users: HashMap<String, String>,
    /**
     * Token ids signed out before their expiry, with that expiry.
     */
    revoked: Mutex<HashMap<String, usize>>,
}

impl JwtSecurityService {
    /**
     * Creates a new instance of JwtSecurityService.
     *
     * # Arguments
     * `secret`: The HS256 secret used to sign and verify tokens.
     * `token_expiry_secs`: Lifetime of issued tokens.
     * `admin_users`: The admins allowed to sign in.
     *
     * # Returns
     * A Result containing the JwtSecurityService or an ApplicationError if initialization fails.
     */
    pub fn new(secret: &str, token_expiry_secs: u64, admin_users: &[AdminUser]) -> Result<Self, ApplicationError> {
        if secret.is_empty() {
            return Err(ApplicationError::new(ErrorType::Initialization, "JWT secret must not be empty".to_string()));
        }
        if token_expiry_secs == 0 {
            return Err(ApplicationError::new(ErrorType::Initialization, "Token expiry must be positive".to_string()));
        }
        let mut users = HashMap::new();
        for admin in admin_users {
            PasswordHash::new(&admin.password_hash).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Invalid password hash for {}: {err}", admin.email)))?;
            users.insert(admin.email.trim().to_lowercase(), admin.password_hash.clone());
        }
        if users.is_empty() {
            warn!("No admin users configured; admin sign in is disabled");
        }
        Ok(JwtSecurityService {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            token_expiry_secs,
            admin_users: users,
            revoked: Mutex::new(HashMap::new()),
        })
    }

    /**
     * Verifies the credentials and issues a token.
     *
     * # Arguments
     * `email`: The admin's email, matched case-insensitively.
     * `password`: The plain text password.
     *
     * # Returns
     * The issued token, or an Unauthorized ApplicationError for unknown users and wrong passwords.
     */
    pub fn sign_in(&self, email: &str, password: &str) -> Result<IssuedToken, ApplicationError> {
        let email = email.trim().to_lowercase();
        let verified = self
            .admin_users
            .get(&email)
            .and_then(|hash| PasswordHash::new(hash).ok())
            .is_some_and(|hash| Argon2::default().verify_password(password.as_bytes(), &hash).is_ok());
        if !verified {
            info!("Rejected sign in for {}", email);
            return Err(ApplicationError::new(ErrorType::Unauthorized, "Invalid login credentials".to_string()));
        }

        let now = Utc::now();
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let iat = now.timestamp() as usize;
        #[allow(clippy::cast_possible_truncation)]
        let exp = iat + self.token_expiry_secs as usize;
        let claim = Claim { sub: email.clone(), iat, exp, jti: Uuid::new_v4().to_string() };
        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claim, &self.encoding_key)
            .map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to issue token: {err}")))?;
        let session = session_from(claim)?;
        info!("Session started for {}", session.email);
        Ok(IssuedToken { token, session })
    }

    /**
     * Resolves the session of the HTTP request from its bearer token.
     *
     * # Arguments
     * `http_request`: The HTTP request containing the JWT token in the Authorization header.
     *
     * # Returns
     * `Authenticated` for a valid, unexpired and not signed out token, otherwise `Unauthenticated`.
     */
    pub fn session(&self, http_request: &HttpRequest) -> SessionState {
        let Some(credentials) = BearerAuth::from_request(http_request, &mut actix_web::dev::Payload::None).into_inner().ok() else {
            return SessionState::Unauthenticated;
        };
        let claim = match jsonwebtoken::decode::<Claim>(credentials.token(), &self.decoding_key, &self.validation) {
            Ok(token_data) => token_data.claims,
            Err(err) => {
                debug!("JWT validation error: {err}");
                return SessionState::Unauthenticated;
            }
        };
        if self.is_revoked(&claim.jti) {
            debug!("Token {} has been signed out", claim.jti);
            return SessionState::Unauthenticated;
        }
        match session_from(claim) {
            Ok(session) => SessionState::Authenticated(session),
            Err(_) => SessionState::Unauthenticated,
        }
    }

    /**
     * Requires an authenticated session.
     *
     * # Arguments
     * `http_request`: The HTTP request containing the JWT token in the Authorization header.
     *
     * # Returns
     * The session, or an Unauthorized ApplicationError.
     */
    pub fn require(&self, http_request: &HttpRequest) -> Result<Session, ApplicationError> {
        match self.session(http_request) {
            SessionState::Authenticated(session) => Ok(session),
            SessionState::Unauthenticated => Err(ApplicationError::new(ErrorType::Unauthorized, "Unauthorized".to_string())),
        }
    }

    /**
     * Signs out the session of the request. The token is rejected from now until it expires.
     *
     * # Arguments
     * `http_request`: The HTTP request containing the JWT token in the Authorization header.
     *
     * # Returns
     * The ended session, or an Unauthorized ApplicationError if there was none.
     */
    pub fn sign_out(&self, http_request: &HttpRequest) -> Result<Session, ApplicationError> {
        let session = self.require(http_request)?;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let expires_at = session.expires_at.timestamp() as usize;
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let now = Utc::now().timestamp() as usize;
        let mut revoked = self.revoked.lock().map_err(|err| ApplicationError::new(ErrorType::Application, format!("Session store unavailable: {err}")))?;
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(session.token_id.clone(), expires_at);
        info!("Session ended for {}", session.email);
        Ok(session)
    }

    fn is_revoked(&self, token_id: &str) -> bool {
        match self.revoked.lock() {
            Ok(revoked) => revoked.contains_key(token_id),
            Err(_) => true,
        }
    }
}

fn session_from(claim: Claim) -> Result<Session, ApplicationError> {
    let expires_at = i64::try_from(claim.exp)
        .ok()
        .and_then(|exp| DateTime::from_timestamp(exp, 0))
        .ok_or_else(|| ApplicationError::new(ErrorType::Unauthorized, "Invalid token expiry".to_string()))?;
    Ok(Session { email: claim.sub, token_id: claim.jti, expires_at })
}

/**
 * Hashes a password for the `adminUsers` section of the configuration.
 *
 * # Arguments
 * `password`: The plain text password.
 *
 * # Returns
 * The Argon2 hash in PHC string format.
 */
pub fn hash_password(password: &str) -> Result<String, ApplicationError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| ApplicationError::new(ErrorType::Application, format!("Failed to hash password: {err}")))
}
