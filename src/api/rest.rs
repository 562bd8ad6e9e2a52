use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    api::security::{IssuedToken, Session, SessionState},
    model::{
        apperror::{ApplicationError, ErrorType},
        records::AdminTab,
    },
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedToken> for LoginResponse {
    fn from(issued: IssuedToken) -> Self {
        LoginResponse { token: issued.token, email: issued.session.email, expires_at: issued.session.expires_at }
    }
}

/**
 * Session as seen by the client. An unauthenticated request gets `authenticated: false` rather than an error.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub authenticated: bool,
    pub email: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<SessionState> for SessionResponse {
    fn from(state: SessionState) -> Self {
        match state {
            SessionState::Authenticated(session) => SessionResponse { authenticated: true, email: Some(session.email), expires_at: Some(session.expires_at) },
            SessionState::Unauthenticated => SessionResponse { authenticated: false, email: None, expires_at: None },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminTabElement {
    pub tab: AdminTab,
    pub label: String,
    pub path: String,
}

/**
 * Response of the protected admin gateway: who is signed in and which editors are available.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccessResponse {
    pub email: String,
    pub tabs: Vec<AdminTabElement>,
}

impl From<Session> for AdminAccessResponse {
    fn from(session: Session) -> Self {
        let tabs = AdminTab::ALL
            .iter()
            .map(|tab| AdminTabElement { tab: *tab, label: tab.label().to_string(), path: format!("/api/v1/admin/{}", tab.path()) })
            .collect();
        AdminAccessResponse { email: session.email, tabs }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordsResponse<R: Serialize> {
    pub tab: AdminTab,
    pub records: Vec<R>,
}

/**
 * A saved row together with the collection refetched after the write.
 */
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSavedResponse<R: Serialize> {
    pub tab: AdminTab,
    pub record: R,
    pub records: Vec<R>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub deleted: bool,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

impl ResponseError for ApplicationError {
    fn status_code(&self) -> StatusCode {
        get_statuscode(&self.error_type)
    }

    fn error_response(&self) -> HttpResponse {
        let error_response = ErrorResponse { code: get_error_code(&self.error_type), message: self.message.clone() };
        HttpResponse::build(get_statuscode(&self.error_type)).json(&error_response)
    }
}

fn get_statuscode(application_error: &ErrorType) -> StatusCode {
    match application_error {
        ErrorType::Unauthorized => StatusCode::UNAUTHORIZED,
        ErrorType::Validation => StatusCode::BAD_REQUEST,
        ErrorType::NotFound => StatusCode::NOT_FOUND,
        ErrorType::ConstraintViolation | ErrorType::InvalidState => StatusCode::CONFLICT,
        ErrorType::Initialization | ErrorType::DatabaseError | ErrorType::Application => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn get_error_code(application_error: &ErrorType) -> u16 {
    match application_error {
        ErrorType::Unauthorized => 1000,
        ErrorType::Initialization => 1001,
        ErrorType::Validation => 1002,
        ErrorType::DatabaseError => 1003,
        ErrorType::NotFound => 1004,
        ErrorType::ConstraintViolation => 1005,
        ErrorType::InvalidState => 1006,
        ErrorType::Application => 1007,
    }
}
