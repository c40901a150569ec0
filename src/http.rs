//! HTTP surface: a thin axum layer over the engine, echoing the original
//! service's JSON envelopes (`status: success|fail|error`).

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use ulid::Ulid;

use crate::engine::{BookingError, Engine, FieldError};
use crate::model::*;

pub fn router(engine: Arc<Engine>) -> Router {
    Router::new()
        .route(
            "/api/appointments",
            post(create_appointment).get(list_appointments),
        )
        .route("/api/appointments/{id}/status", patch(update_status))
        .route("/api/data/services", get(list_services))
        .route("/api/data/stylists", get(list_stylists))
        .route("/api/data/customers", get(list_customers))
        .route("/api/data/inventory", get(list_inventory))
        .route("/api/dashboard/stats", get(dashboard_stats))
        .route("/health", get(health))
        .with_state(engine)
}

// ── Envelopes ────────────────────────────────────────────────────

fn json_fail(status: StatusCode, message: impl Into<String>) -> Response {
    // 4xx = "fail", 5xx = "error", the original middleware's convention.
    let word = if status.is_client_error() { "fail" } else { "error" };
    (
        status,
        Json(json!({ "status": word, "message": message.into() })),
    )
        .into_response()
}

fn json_list<T: Serialize>(items: Vec<T>) -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "success", "results": items.len(), "data": items })),
    )
        .into_response()
}

fn error_response(err: BookingError) -> Response {
    let status = match &err {
        BookingError::Validation(_)
        | BookingError::InvalidRole(_)
        | BookingError::SkillMismatch { .. }
        | BookingError::InvalidTransition { .. }
        | BookingError::DuplicateSku(_)
        | BookingError::LimitExceeded(_) => StatusCode::BAD_REQUEST,
        BookingError::NotFound(_) => StatusCode::NOT_FOUND,
        BookingError::Conflict(_) | BookingError::InsufficientStock { .. } => StatusCode::CONFLICT,
        BookingError::Internal(_) | BookingError::WalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if let BookingError::Validation(errors) = &err {
        let errors: Vec<_> = errors
            .iter()
            .map(|e| json!({ "field": e.field, "message": e.message }))
            .collect();
        return (
            status,
            Json(json!({ "status": "fail", "message": "Validation Error", "errors": errors })),
        )
            .into_response();
    }
    json_fail(status, err.to_string())
}

// ── Wire DTOs ────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AppointmentDto {
    id: Ulid,
    customer: Ulid,
    stylist: Ulid,
    service: Ulid,
    start_time: Ms,
    end_time: Ms,
    status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    notes: Option<String>,
    created_at: Ms,
    updated_at: Ms,
}

impl From<Appointment> for AppointmentDto {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            customer: a.customer,
            stylist: a.stylist,
            service: a.service,
            start_time: a.span.start,
            end_time: a.span.end,
            status: a.status,
            notes: a.notes,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceListing {
    id: Ulid,
    name: String,
    price: u64,
    duration_mins: u32,
    required_skill_level: SkillLevel,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct StylistListing {
    id: Ulid,
    name: String,
    skill_level: SkillLevel,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CustomerListing {
    id: Ulid,
    name: String,
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InventoryDto {
    id: Ulid,
    item_name: String,
    sku: String,
    stock_level: u64,
    unit: String,
    reorder_point: u64,
    cost_per_unit: Option<u64>,
    expiry_at: Option<Ms>,
    created_at: Ms,
}

impl From<InventoryItem> for InventoryDto {
    fn from(i: InventoryItem) -> Self {
        Self {
            id: i.id,
            item_name: i.name,
            sku: i.sku,
            stock_level: i.stock_level,
            unit: i.unit,
            reorder_point: i.reorder_point,
            cost_per_unit: i.cost_per_unit,
            expiry_at: i.expiry_at,
            created_at: i.created_at,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAppointmentBody {
    customer: Option<Ulid>,
    stylist: Option<Ulid>,
    service: Option<Ulid>,
    start_time: Option<Ms>,
    end_time: Option<Ms>,
    notes: Option<String>,
}

#[derive(Deserialize)]
struct UpdateStatusBody {
    status: AppointmentStatus,
}

// ── Handlers ─────────────────────────────────────────────────────

async fn create_appointment(
    State(engine): State<Arc<Engine>>,
    payload: Result<Json<CreateAppointmentBody>, JsonRejection>,
) -> Response {
    let Json(body) = match payload {
        Ok(json) => json,
        Err(rejection) => return json_fail(StatusCode::BAD_REQUEST, rejection.body_text()),
    };

    let (Some(customer), Some(stylist), Some(service), Some(start_time), Some(end_time)) = (
        body.customer,
        body.stylist,
        body.service,
        body.start_time,
        body.end_time,
    ) else {
        let mut errors = Vec::new();
        if body.customer.is_none() {
            errors.push(FieldError::new("customer", "Required"));
        }
        if body.stylist.is_none() {
            errors.push(FieldError::new("stylist", "Required"));
        }
        if body.service.is_none() {
            errors.push(FieldError::new("service", "Required"));
        }
        if body.start_time.is_none() {
            errors.push(FieldError::new("startTime", "Required"));
        }
        if body.end_time.is_none() {
            errors.push(FieldError::new("endTime", "Required"));
        }
        return error_response(BookingError::Validation(errors));
    };

    let req = BookingRequest {
        customer,
        stylist,
        service,
        start_time,
        end_time,
        notes: body.notes,
    };
    match engine.book_appointment(req).await {
        Ok(appointment) => {
            tracing::info!(appointment = %appointment.id, stylist = %appointment.stylist, "appointment created");
            (
                StatusCode::CREATED,
                Json(json!({
                    "status": "success",
                    "data": { "appointment": AppointmentDto::from(appointment) }
                })),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn update_status(
    State(engine): State<Arc<Engine>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateStatusBody>, JsonRejection>,
) -> Response {
    let Ok(id) = id.parse::<Ulid>() else {
        return json_fail(StatusCode::BAD_REQUEST, format!("Invalid id: {id}"));
    };
    let Json(body) = match payload {
        Ok(json) => json,
        Err(rejection) => return json_fail(StatusCode::BAD_REQUEST, rejection.body_text()),
    };
    match engine.transition_appointment(id, body.status).await {
        Ok(appointment) => {
            tracing::info!(appointment = %id, status = appointment.status.as_str(), "appointment status updated");
            (
                StatusCode::OK,
                Json(json!({
                    "status": "success",
                    "data": { "appointment": AppointmentDto::from(appointment) }
                })),
            )
                .into_response()
        }
        Err(e) => error_response(e),
    }
}

async fn list_appointments(State(engine): State<Arc<Engine>>) -> Response {
    let appointments: Vec<AppointmentDto> = engine
        .list_appointments()
        .await
        .into_iter()
        .map(Into::into)
        .collect();
    json_list(appointments)
}

async fn list_services(State(engine): State<Arc<Engine>>) -> Response {
    let services: Vec<ServiceListing> = engine
        .list_services()
        .into_iter()
        .map(|s| ServiceListing {
            id: s.id,
            name: s.name,
            price: s.price,
            duration_mins: s.duration_mins,
            required_skill_level: s.required_skill,
        })
        .collect();
    json_list(services)
}

async fn list_stylists(State(engine): State<Arc<Engine>>) -> Response {
    let stylists: Vec<StylistListing> = engine
        .list_staff()
        .into_iter()
        .map(|p| StylistListing {
            id: p.id,
            skill_level: p.effective_skill(),
            name: p.name,
        })
        .collect();
    json_list(stylists)
}

async fn list_customers(State(engine): State<Arc<Engine>>) -> Response {
    let customers: Vec<CustomerListing> = engine
        .list_customers()
        .into_iter()
        .map(|p| CustomerListing {
            id: p.id,
            name: p.name,
            email: p.email,
        })
        .collect();
    json_list(customers)
}

async fn list_inventory(State(engine): State<Arc<Engine>>) -> Response {
    let items: Vec<InventoryDto> = engine
        .list_inventory()
        .await
        .into_iter()
        .map(Into::into)
        .collect();
    json_list(items)
}

async fn dashboard_stats(State(engine): State<Arc<Engine>>) -> Response {
    let stats = engine.dashboard_stats().await;
    let top_stylist = stats
        .top_stylist
        .map(|t| t.name)
        .unwrap_or_else(|| "N/A".into());
    let low_stock_items: Vec<InventoryDto> = stats
        .low_stock_items
        .into_iter()
        .map(Into::into)
        .collect();
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "data": {
                "totalRevenue": stats.total_revenue,
                "totalAppointments": stats.total_appointments,
                "lowStockCount": low_stock_items.len(),
                "topStylist": top_stylist,
                "lowStockItems": low_stock_items,
            }
        })),
    )
        .into_response()
}

async fn health() -> Response {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "message": "Backend is running" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn status_codes_follow_the_error_taxonomy() {
        let cases = [
            (
                BookingError::Validation(vec![FieldError::new("endTime", "Required")]),
                StatusCode::BAD_REQUEST,
            ),
            (BookingError::InvalidRole(Ulid::new()), StatusCode::BAD_REQUEST),
            (
                BookingError::SkillMismatch { required: SkillLevel::Expert },
                StatusCode::BAD_REQUEST,
            ),
            (
                BookingError::InvalidTransition {
                    from: AppointmentStatus::Completed,
                    to: AppointmentStatus::Cancelled,
                },
                StatusCode::BAD_REQUEST,
            ),
            (BookingError::NotFound("Service"), StatusCode::NOT_FOUND),
            (BookingError::Conflict(Ulid::new()), StatusCode::CONFLICT),
            (
                BookingError::InsufficientStock {
                    item: "Matrix SoColor Red".into(),
                    required: 100,
                    available: 20,
                    unit: "ml".into(),
                },
                StatusCode::CONFLICT,
            ),
            (
                BookingError::Internal("Inventory item not found for this service".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (
                BookingError::WalError("disk full".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(err).status(), expected);
        }
    }

    #[tokio::test]
    async fn validation_body_lists_every_field() {
        let resp = error_response(BookingError::Validation(vec![
            FieldError::new("startTime", "Required"),
            FieldError::new("endTime", "Required"),
        ]));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let v = body_json(resp).await;
        assert_eq!(v["status"], "fail");
        assert_eq!(v["message"], "Validation Error");
        let errors = v["errors"].as_array().unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0]["field"], "startTime");
        assert_eq!(errors[1]["field"], "endTime");
    }

    #[tokio::test]
    async fn client_errors_say_fail_server_errors_say_error() {
        let conflict = error_response(BookingError::Conflict(Ulid::new()));
        let v = body_json(conflict).await;
        assert_eq!(v["status"], "fail");
        assert_eq!(v["message"], "Stylist is already booked for this time slot");

        let internal = error_response(BookingError::Internal("dangling".into()));
        let v = body_json(internal).await;
        assert_eq!(v["status"], "error");
    }

    #[test]
    fn appointment_dto_uses_wire_field_names() {
        let now = 1_700_000_000_000;
        let dto = AppointmentDto::from(Appointment {
            id: Ulid::new(),
            customer: Ulid::new(),
            stylist: Ulid::new(),
            service: Ulid::new(),
            span: Span::new(now, now + 3_600_000),
            status: AppointmentStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
        });
        let v = serde_json::to_value(&dto).unwrap();
        assert_eq!(v["startTime"], now);
        assert_eq!(v["endTime"], now + 3_600_000);
        assert_eq!(v["status"], "Pending");
        assert!(v.get("notes").is_none());
        assert!(v["id"].is_string());
    }

    #[test]
    fn inventory_dto_uses_original_field_names() {
        let dto = InventoryDto::from(InventoryItem {
            id: Ulid::new(),
            name: "Gold Keratin Tub".into(),
            sku: "TRT-KER-001".into(),
            stock_level: 5,
            unit: "tubs".into(),
            reorder_point: 8,
            cost_per_unit: Some(15_000),
            expiry_at: None,
            created_at: 0,
        });
        let v = serde_json::to_value(&dto).unwrap();
        assert_eq!(v["itemName"], "Gold Keratin Tub");
        assert_eq!(v["stockLevel"], 5);
        assert_eq!(v["reorderPoint"], 8);
    }
}
