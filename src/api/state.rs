use crate::{
    api::security::JwtSecurityService,
    model::config::ReportSettings,
    service::{report::ReportClock, store::RegistrationService},
};

/**
* Represents the application state shared across the Actix web application.
*/
pub struct AppState {
    /**
     * The JWT security service for signing admins in and out.
     */
    pub jwt_service: JwtSecurityService,
    /**
     * The registration service for reading and writing the registration tables.
     */
    pub registration_service: RegistrationService,
    /**
     * Titles shown on the report.
     */
    pub report_settings: ReportSettings,
    /**
     * Clock stamped on the report. Stops when the state is dropped.
     */
    pub clock: ReportClock,
}

/**
 * Creates a new instance of `AppState`.
 *
 * # Arguments
 * `jwt_service`: The JWT security service for handling authentication.
 * `registration_service`: The registration service for handling table operations.
 * `report_settings`: Titles shown on the report.
 * `clock`: The running report clock.
 */
impl AppState {
    pub fn new(jwt_service: JwtSecurityService, registration_service: RegistrationService, report_settings: ReportSettings, clock: ReportClock) -> Self {
        AppState { jwt_service, registration_service, report_settings, clock }
    }
}
