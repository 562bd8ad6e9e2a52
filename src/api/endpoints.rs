use actix_web::{
    HttpRequest, HttpResponse, get,
    http::header::CONTENT_DISPOSITION,
    post,
    web::{self, Path},
};
use tracing::{Instrument, instrument};
use uuid::Uuid;

use crate::{
    api::{
        rest::{AdminAccessResponse, DeleteQuery, DeleteResponse, LoginRequest, LoginResponse, RecordSavedResponse, RecordsResponse, SearchQuery, SessionResponse},
        state::AppState,
    },
    model::{
        apperror::{ApplicationError, ErrorType},
        records::{CountyRegistration, GrowthMetric, MonthlyRegistration, Record, SectorRegistration, WeeklyRegistration},
    },
    service::{
        editor::{DeleteOutcome, Editor},
        export::{EXPORT_FILE_NAME, export_pdf},
        report::build_report,
        store::RegistrationService,
    },
};

/**
 * Endpoint returning the composed public report.
 */
#[instrument(skip(http_request, app_state), fields(service = "getReport", trace_id = get_trace_id(&http_request), result))]
#[get("/api/v1/report")]
pub async fn get_report(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let report = build_report(&app_state.registration_service, &app_state.report_settings, app_state.clock.now()).instrument(span).await;
    Ok(HttpResponse::Ok().json(report))
}

/**
 * Endpoint returning the report as a PDF download.
 */
#[instrument(skip(http_request, app_state), fields(service = "exportReport", trace_id = get_trace_id(&http_request), result))]
#[get("/api/v1/report/export")]
pub async fn report_export(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    let report = build_report(&app_state.registration_service, &app_state.report_settings, app_state.clock.now()).instrument(span).await;
    let pdf = export_pdf(&report)?;
    Ok(HttpResponse::Ok()
        .content_type("application/pdf")
        .insert_header((CONTENT_DISPOSITION, format!("attachment; filename=\"{EXPORT_FILE_NAME}\"")))
        .body(pdf))
}

/**
 * Endpoint to sign in an admin.
 */
#[instrument(skip(http_request, request_body, app_state), fields(service = "login", trace_id = get_trace_id(&http_request), result))]
#[post("/api/v1/auth/login")]
pub async fn login(http_request: HttpRequest, request_body: web::Json<LoginRequest>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let issued = app_state.jwt_service.sign_in(&request_body.email, &request_body.password)?;
    Ok(HttpResponse::Ok().json(LoginResponse::from(issued)))
}

/**
 * Endpoint to sign out the current session.
 */
#[instrument(skip(http_request, app_state), fields(service = "logout", trace_id = get_trace_id(&http_request), result))]
#[post("/api/v1/auth/logout")]
pub async fn logout(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    app_state.jwt_service.sign_out(&http_request)?;
    Ok(HttpResponse::NoContent().finish())
}

/**
 * Endpoint reporting whether the request carries a valid session.
 */
#[instrument(skip(http_request, app_state), fields(service = "getSession", trace_id = get_trace_id(&http_request), result))]
#[get("/api/v1/auth/session")]
pub async fn get_session(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    Ok(HttpResponse::Ok().json(SessionResponse::from(app_state.jwt_service.session(&http_request))))
}

/**
 * Protected gateway to the admin editors.
 */
#[instrument(skip(http_request, app_state), fields(service = "adminAccess", trace_id = get_trace_id(&http_request), result))]
#[get("/api/v1/admin-access")]
pub async fn admin_access(http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let session = app_state.jwt_service.require(&http_request)?;
    Ok(HttpResponse::Ok().json(AdminAccessResponse::from(session)))
}

/**
 * Lists the rows of one editor, optionally filtered by its search.
 */
#[instrument(skip(http_request, app_state), fields(service = "listRecords", table = R::TABLE.as_str(), trace_id = get_trace_id(&http_request), result))]
async fn list_records<R: Record>(http_request: HttpRequest, query: web::Query<SearchQuery>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.require(&http_request)?;
    let editor = Editor::<RegistrationService, R>::open(&app_state.registration_service).instrument(span).await;
    let records: Vec<R> = editor.filtered(query.search.as_deref()).into_iter().cloned().collect();
    Ok(HttpResponse::Ok().json(RecordsResponse { tab: R::TAB, records }))
}

/**
 * Adds a row through the editor of its table.
 */
#[instrument(skip(http_request, request_body, app_state), fields(service = "addRecord", table = R::TABLE.as_str(), trace_id = get_trace_id(&http_request), result))]
async fn add_record<R: Record>(http_request: HttpRequest, request_body: web::Json<R::Input>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.require(&http_request)?;
    let mut editor = Editor::<RegistrationService, R>::open(&app_state.registration_service).instrument(span.clone()).await;
    editor.begin_add()?;
    let saved = editor.save(request_body.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Created().json(RecordSavedResponse { tab: R::TAB, record: saved, records: editor.records().to_vec() }))
}

/**
 * Replaces the editable fields of a row.
 */
#[instrument(skip(http_request, request_body, app_state), fields(service = "updateRecord", table = R::TABLE.as_str(), trace_id = get_trace_id(&http_request), result))]
async fn update_record<R: Record>(path: Path<Uuid>, http_request: HttpRequest, request_body: web::Json<R::Input>, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.require(&http_request)?;
    let mut editor = Editor::<RegistrationService, R>::load(&app_state.registration_service).instrument(span.clone()).await?;
    editor.begin_edit(path.into_inner())?;
    let saved = editor.save(request_body.into_inner()).instrument(span).await?;
    Ok(HttpResponse::Ok().json(RecordSavedResponse { tab: R::TAB, record: saved, records: editor.records().to_vec() }))
}

/**
 * Deletes a row. Without `confirm=true` nothing is deleted.
 */
#[instrument(skip(http_request, app_state), fields(service = "deleteRecord", table = R::TABLE.as_str(), trace_id = get_trace_id(&http_request), result))]
async fn delete_record<R: Record>(path: Path<Uuid>, query: web::Query<DeleteQuery>, http_request: HttpRequest, app_state: web::Data<AppState>) -> Result<HttpResponse, ApplicationError> {
    let span = tracing::Span::current();
    app_state.jwt_service.require(&http_request)?;
    let mut editor = Editor::<RegistrationService, R>::open(&app_state.registration_service).instrument(span.clone()).await;
    let outcome = editor.delete(path.into_inner(), query.confirm).instrument(span).await?;
    Ok(HttpResponse::Ok().json(DeleteResponse { deleted: outcome == DeleteOutcome::Deleted }))
}

/**
 * Registers the editor routes of one table under `/api/v1/admin/{tab}`.
 */
fn configure_admin<R: Record>(cfg: &mut web::ServiceConfig) {
    let path = format!("/api/v1/admin/{}", R::TAB.path());
    cfg.service(web::resource(path.clone()).route(web::get().to(list_records::<R>)).route(web::post().to(add_record::<R>)))
        .service(web::resource(format!("{path}/{{id}}")).route(web::put().to(update_record::<R>)).route(web::delete().to(delete_record::<R>)));
}

/**
 * Registers every API route.
 */
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(get_report).service(report_export).service(login).service(logout).service(get_session).service(admin_access);
    configure_admin::<MonthlyRegistration>(cfg);
    configure_admin::<WeeklyRegistration>(cfg);
    configure_admin::<CountyRegistration>(cfg);
    configure_admin::<SectorRegistration>(cfg);
    configure_admin::<GrowthMetric>(cfg);
}

/**
 * JSON body configuration reporting malformed bodies, including non-numeric counts, as validation errors.
 */
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().content_type_required(false).error_handler(|err, _request| {
        ApplicationError::new(ErrorType::Validation, format!("Invalid request body: {err}")).into()
    })
}

/**
 * Retrieves the trace ID from the HTTP request headers.
 * If the trace ID is not present, a new UUID is generated.
 */
fn get_trace_id(http_request: &HttpRequest) -> String {
    http_request.headers().get("X-Trace-ID").and_then(|v| v.to_str().ok().map(std::string::ToString::to_string)).unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}
