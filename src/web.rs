use actix_web::{middleware, web, App, HttpRequest, HttpResponse, HttpServer};
use chrono::NaiveDate;
use log::info;
use serde::Serialize;

use crate::clinic::Clinic;
use crate::directory::Doctor;
use crate::error::{ClinicError, Result};
use crate::form::{
    validate_booking, validate_doctor_update, validate_slot_form, validate_update, BatchStatusRequest,
    BookingRequest, DoctorUpdateRequest, RecordRequest, RegistrationUpdateRequest, SlotForm, StatusRequest,
};
use crate::identity::{require_identity, Identity, Role};
use crate::registration::Registration;
use crate::schedule::parse_work_date;

pub struct AppState {
    pub clinic: Clinic,
}

impl AppState {
    pub fn new(clinic: Clinic) -> Self {
        Self { clinic }
    }
}

fn success<T: Serialize>(data: T) -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "code": 0,
        "msg": "success",
        "data": data,
    }))
}

fn require_admin(req: &HttpRequest) -> Result<Identity> {
    let identity = require_identity(req)?;
    identity.require_role(&[Role::Admin])?;
    Ok(identity)
}

/// Patient id the caller is limited to. None means unrestricted (admin).
fn patient_scope(clinic: &Clinic, identity: &Identity) -> Result<Option<u64>> {
    identity.require_role(&[Role::Patient, Role::Admin])?;
    if identity.role == Role::Admin {
        return Ok(None);
    }
    clinic
        .directory()
        .patient_by_username(&identity.username)
        .map(|p| Some(p.id))
        .ok_or_else(|| ClinicError::forbidden("current user is not a registered patient"))
}

fn ensure_patient(scope: Option<u64>, patient_id: u64) -> Result<()> {
    match scope {
        Some(own) if own != patient_id => Err(ClinicError::forbidden(
            "patients may only book for themselves",
        )),
        _ => Ok(()),
    }
}

/// Another patient's registration reads the same as a missing one.
fn ensure_visible(scope: Option<u64>, registration: &Registration) -> Result<()> {
    match scope {
        Some(own) if own != registration.patient_id => Err(ClinicError::not_found("registration not found")),
        _ => Ok(()),
    }
}

fn acting_doctor(req: &HttpRequest, state: &AppState) -> Result<Doctor> {
    let identity = require_identity(req)?;
    state.clinic.acting_doctor(Some(&identity))
}

// Schedules

async fn list_schedules(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    require_identity(&req)?;
    Ok(success(state.clinic.list_slots()?))
}

async fn get_schedule(
    req: HttpRequest,
    path: web::Path<u64>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_identity(&req)?;
    Ok(success(state.clinic.get_slot(path.into_inner())?))
}

async fn schedules_by_date(
    req: HttpRequest,
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_identity(&req)?;
    let date: NaiveDate = parse_work_date(&path)
        .ok_or_else(|| ClinicError::validation("date must be YYYY-MM-DD"))?;
    Ok(success(state.clinic.list_slots_by_date(date)?))
}

async fn create_schedule(
    req: HttpRequest,
    body: web::Json<SlotForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let admin = require_admin(&req)?;
    let draft = validate_slot_form(&body)?;
    let slot = state.clinic.create_slot(draft)?;
    info!("{} created schedule {}", admin.username, slot.id);
    Ok(success(slot))
}

async fn update_schedule(
    req: HttpRequest,
    path: web::Path<u64>,
    body: web::Json<SlotForm>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    let draft = validate_slot_form(&body)?;
    Ok(success(state.clinic.update_slot(path.into_inner(), draft)?))
}

async fn delete_schedule(
    req: HttpRequest,
    path: web::Path<u64>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    require_admin(&req)?;
    state.clinic.delete_slot(path.into_inner())?;
    Ok(success(serde_json::Value::Null))
}

// Registrations

async fn get_registration(
    req: HttpRequest,
    path: web::Path<u64>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let identity = require_identity(&req)?;
    let registration = state.clinic.get_registration(path.into_inner())?;
    match identity.role {
        Role::Doctor => {
            let doctor = state.clinic.acting_doctor(Some(&identity))?;
            if registration.doctor_id != doctor.id {
                return Err(ClinicError::not_found("registration not found for this doctor"));
            }
        }
        _ => {
            let scope = patient_scope(&state.clinic, &identity)?;
            ensure_visible(scope, &registration)?;
        }
    }
    Ok(success(registration))
}

async fn create_registration(
    req: HttpRequest,
    body: web::Json<BookingRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let identity = require_identity(&req)?;
    let scope = patient_scope(&state.clinic, &identity)?;
    let booking = validate_booking(&body)?;
    ensure_patient(scope, booking.patient_id)?;
    let registration = state.clinic.create_registration(booking)?;
    Ok(success(registration))
}

/// Checks the caller may touch registration `id` and returns their patient scope.
fn scope_for(req: &HttpRequest, state: &AppState, id: u64) -> Result<Option<u64>> {
    let identity = require_identity(req)?;
    let scope = patient_scope(&state.clinic, &identity)?;
    let registration = state.clinic.get_registration(id)?;
    ensure_visible(scope, &registration)?;
    Ok(scope)
}

async fn update_registration(
    req: HttpRequest,
    path: web::Path<u64>,
    body: web::Json<RegistrationUpdateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    let scope = scope_for(&req, &state, id)?;
    let patch = validate_update(&body)?;
    if scope.is_some() && patch.touches_staff_fields() {
        return Err(ClinicError::forbidden(
            "patients may not change status, payment, fee or registration type",
        ));
    }
    Ok(success(state.clinic.update_registration(id, patch)?))
}

async fn cancel_registration(
    req: HttpRequest,
    path: web::Path<u64>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    scope_for(&req, &state, id)?;
    state.clinic.cancel_registration(id)?;
    Ok(success(serde_json::Value::Null))
}

// Doctor worklist

async fn doctor_registrations(req: HttpRequest, state: web::Data<AppState>) -> Result<HttpResponse> {
    let doctor = acting_doctor(&req, &state)?;
    Ok(success(state.clinic.doctor_registrations(&doctor)?))
}

async fn doctor_update_status(
    req: HttpRequest,
    path: web::Path<u64>,
    body: web::Json<StatusRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let doctor = acting_doctor(&req, &state)?;
    let view = state
        .clinic
        .doctor_update_status(&doctor, path.into_inner(), &body.status)?;
    Ok(success(view))
}

async fn doctor_update_registration(
    req: HttpRequest,
    path: web::Path<u64>,
    body: web::Json<DoctorUpdateRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let doctor = acting_doctor(&req, &state)?;
    let patch = validate_doctor_update(&body)?;
    let view = state
        .clinic
        .doctor_update_registration(&doctor, path.into_inner(), patch)?;
    Ok(success(view))
}

async fn doctor_batch_status(
    req: HttpRequest,
    body: web::Json<BatchStatusRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let doctor = acting_doctor(&req, &state)?;
    let updated = state
        .clinic
        .doctor_batch_update_status(&doctor, &body.ids, &body.status)?;
    Ok(success(serde_json::json!({ "updated": updated })))
}

async fn doctor_get_record(
    req: HttpRequest,
    path: web::Path<u64>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let doctor = acting_doctor(&req, &state)?;
    Ok(success(state.clinic.doctor_record(&doctor, path.into_inner())?))
}

async fn doctor_upsert_record(
    req: HttpRequest,
    path: web::Path<u64>,
    body: web::Json<RecordRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let doctor = acting_doctor(&req, &state)?;
    let record = state
        .clinic
        .doctor_upsert_record(&doctor, path.into_inner(), body.into_inner())?;
    Ok(success(record))
}

/// Malformed JSON bodies get the same envelope as every other validation error
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        ClinicError::validation(format!("invalid request body: {err}")).into()
    })
}

/// Registers every API route. The caller provides `web::Data<AppState>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(
            web::resource("/api/schedules")
                .route(web::get().to(list_schedules))
                .route(web::post().to(create_schedule)),
        )
        .route("/api/schedules/date/{date}", web::get().to(schedules_by_date))
        .service(
            web::resource("/api/schedules/{id}")
                .route(web::get().to(get_schedule))
                .route(web::put().to(update_schedule))
                .route(web::delete().to(delete_schedule)),
        )
        .route("/api/registrations", web::post().to(create_registration))
        .service(
            web::resource("/api/registrations/{id}")
                .route(web::get().to(get_registration))
                .route(web::put().to(update_registration))
                .route(web::delete().to(cancel_registration)),
        )
        .route("/api/doctors/registrations", web::get().to(doctor_registrations))
        // before the {id} routes so "batch" is not read as an id
        .route(
            "/api/doctors/registrations/batch/status",
            web::put().to(doctor_batch_status),
        )
        .route(
            "/api/doctors/registrations/{id}/status",
            web::put().to(doctor_update_status),
        )
        .route(
            "/api/doctors/registrations/{id}",
            web::put().to(doctor_update_registration),
        )
        .service(
            web::resource("/api/doctors/registrations/{id}/medical-record")
                .route(web::get().to(doctor_get_record))
                .route(web::post().to(doctor_upsert_record)),
        );
}

pub async fn start_server(bind: &str, port: u16, clinic: Clinic) -> std::io::Result<()> {
    let app_state = web::Data::new(AppState::new(clinic));

    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            .wrap(middleware::Logger::default())
            .configure(configure)
    })
    .bind((bind, port))?
    .run()
    .await
}
