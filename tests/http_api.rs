use std::sync::Arc;

use serde_json::{json, Value};
use tokio::net::TcpListener;
use ulid::Ulid;

use chairtime::engine::Engine;
use chairtime::http::router;
use chairtime::model::{Consumable, Ms, Role, SkillLevel};

const H: Ms = 3_600_000;
const T0: Ms = 1_756_080_000_000;

// ── Test infrastructure ──────────────────────────────────────

async fn start_test_server() -> (String, Arc<Engine>) {
    let dir = std::env::temp_dir().join(format!("chairtime_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    let engine = Arc::new(Engine::new(dir.join("salon.wal")).unwrap());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(engine.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), engine)
}

async fn get_json(url: &str) -> (u16, Value) {
    let resp = reqwest::Client::new().get(url).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn post_json(url: &str, body: &Value) -> (u16, Value) {
    let resp = reqwest::Client::new().post(url).json(body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn patch_json(url: &str, body: &Value) -> (u16, Value) {
    let resp = reqwest::Client::new().patch(url).json(body).send().await.unwrap();
    let status = resp.status().as_u16();
    (status, resp.json().await.unwrap())
}

async fn add_staff(engine: &Engine, name: &str, skill: SkillLevel) -> Ulid {
    let email = format!("{}@salon.test", name.to_lowercase().replace(' ', "."));
    engine
        .create_person(name.into(), email, None, Role::Staff, Some(skill), Some(30))
        .await
        .unwrap()
        .id
}

async fn add_customer(engine: &Engine) -> Ulid {
    engine
        .create_person(
            "Demo Customer".into(),
            "demo@customer.test".into(),
            None,
            Role::Customer,
            None,
            None,
        )
        .await
        .unwrap()
        .id
}

async fn add_item(engine: &Engine, name: &str, sku: &str, stock: u64, unit: &str) -> Ulid {
    engine
        .create_inventory_item(name.into(), sku.into(), stock, unit.into(), 10, None, None)
        .await
        .unwrap()
        .id
}

async fn add_service(
    engine: &Engine,
    name: &str,
    price: u64,
    skill: SkillLevel,
    consumables: Vec<Consumable>,
) -> Ulid {
    engine
        .create_service(name.into(), None, price, 60, skill, consumables)
        .await
        .unwrap()
        .id
}

fn book_body(customer: Ulid, stylist: Ulid, service: Ulid, start: Ms, end: Ms) -> Value {
    json!({
        "customer": customer,
        "stylist": stylist,
        "service": service,
        "startTime": start,
        "endTime": end,
    })
}

// ── Tests ────────────────────────────────────────────────────

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let (base, _engine) = start_test_server().await;
    let (status, v) = get_json(&format!("{base}/health")).await;
    assert_eq!(status, 200);
    assert_eq!(v["status"], "ok");
    assert_eq!(v["message"], "Backend is running");
}

#[tokio::test]
async fn create_appointment_returns_the_full_envelope() {
    let (base, engine) = start_test_server().await;
    let customer = add_customer(&engine).await;
    let stylist = add_staff(&engine, "Alice Styles", SkillLevel::Expert).await;
    let service = add_service(&engine, "Basic Haircut", 30, SkillLevel::Basic, vec![]).await;

    let (status, v) = post_json(
        &format!("{base}/api/appointments"),
        &book_body(customer, stylist, service, T0 + 9 * H, T0 + 10 * H),
    )
    .await;

    assert_eq!(status, 201);
    assert_eq!(v["status"], "success");
    let appointment = &v["data"]["appointment"];
    assert!(appointment["id"].is_string());
    assert_eq!(appointment["status"], "Pending");
    assert_eq!(appointment["startTime"], T0 + 9 * H);
    assert_eq!(appointment["endTime"], T0 + 10 * H);
    assert!(appointment["createdAt"].is_number());
    // No notes sent, no notes field back
    assert!(appointment.get("notes").is_none());
}

#[tokio::test]
async fn missing_fields_are_reported_as_required() {
    let (base, _engine) = start_test_server().await;

    let (status, v) = post_json(&format!("{base}/api/appointments"), &json!({})).await;

    assert_eq!(status, 400);
    assert_eq!(v["status"], "fail");
    assert_eq!(v["message"], "Validation Error");
    let errors = v["errors"].as_array().unwrap();
    let fields: Vec<&str> = errors.iter().map(|e| e["field"].as_str().unwrap()).collect();
    assert_eq!(fields, ["customer", "stylist", "service", "startTime", "endTime"]);
    assert!(errors.iter().all(|e| e["message"] == "Required"));
}

#[tokio::test]
async fn malformed_json_is_rejected() {
    let (base, _engine) = start_test_server().await;

    let resp = reqwest::Client::new()
        .post(format!("{base}/api/appointments"))
        .header("content-type", "application/json")
        .body("{ not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
    let v: Value = resp.json().await.unwrap();
    assert_eq!(v["status"], "fail");
}

#[tokio::test]
async fn unknown_references_are_not_found() {
    let (base, engine) = start_test_server().await;
    let customer = add_customer(&engine).await;
    let stylist = add_staff(&engine, "Alice Styles", SkillLevel::Expert).await;
    let service = add_service(&engine, "Basic Haircut", 30, SkillLevel::Basic, vec![]).await;

    let (status, v) = post_json(
        &format!("{base}/api/appointments"),
        &book_body(customer, stylist, Ulid::new(), T0 + 9 * H, T0 + 10 * H),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(v["message"], "Service not found");

    let (status, v) = post_json(
        &format!("{base}/api/appointments"),
        &book_body(customer, Ulid::new(), service, T0 + 9 * H, T0 + 10 * H),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(v["message"], "Stylist not found");
}

#[tokio::test]
async fn double_booking_is_a_conflict() {
    let (base, engine) = start_test_server().await;
    let customer = add_customer(&engine).await;
    let stylist = add_staff(&engine, "Alice Styles", SkillLevel::Expert).await;
    let service = add_service(&engine, "Basic Haircut", 30, SkillLevel::Basic, vec![]).await;
    let body = book_body(customer, stylist, service, T0 + 9 * H, T0 + 10 * H);

    let (status, _) = post_json(&format!("{base}/api/appointments"), &body).await;
    assert_eq!(status, 201);

    let (status, v) = post_json(&format!("{base}/api/appointments"), &body).await;
    assert_eq!(status, 409);
    assert_eq!(v["status"], "fail");
    assert_eq!(v["message"], "Stylist is already booked for this time slot");
}

#[tokio::test]
async fn insufficient_stock_is_a_conflict() {
    let (base, engine) = start_test_server().await;
    let customer = add_customer(&engine).await;
    let stylist = add_staff(&engine, "Alice Styles", SkillLevel::Expert).await;
    let dye = add_item(&engine, "Matrix SoColor Red", "DYE-RED-001", 20, "ml").await;
    let service = add_service(
        &engine,
        "Luxury Hair Dye",
        150,
        SkillLevel::Expert,
        vec![Consumable { item_id: dye, quantity: 100 }],
    )
    .await;

    let (status, v) = post_json(
        &format!("{base}/api/appointments"),
        &book_body(customer, stylist, service, T0 + 9 * H, T0 + 10 * H),
    )
    .await;
    assert_eq!(status, 409);
    assert_eq!(
        v["message"],
        "Insufficient inventory: Matrix SoColor Red (Required: 100 ml, Available: 20)"
    );
}

#[tokio::test]
async fn unqualified_stylist_is_a_bad_request() {
    let (base, engine) = start_test_server().await;
    let customer = add_customer(&engine).await;
    let stylist = add_staff(&engine, "Bob Cutter", SkillLevel::Basic).await;
    let service = add_service(&engine, "Luxury Hair Dye", 150, SkillLevel::Expert, vec![]).await;

    let (status, v) = post_json(
        &format!("{base}/api/appointments"),
        &book_body(customer, stylist, service, T0 + 9 * H, T0 + 10 * H),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(
        v["message"],
        "Stylist does not meet the required skill level (Expert) for this service."
    );
}

#[tokio::test]
async fn dangling_consumable_is_a_server_error() {
    let (base, engine) = start_test_server().await;
    let customer = add_customer(&engine).await;
    let stylist = add_staff(&engine, "Alice Styles", SkillLevel::Expert).await;
    let service = add_service(
        &engine,
        "Ghost Treatment",
        99,
        SkillLevel::Basic,
        vec![Consumable { item_id: Ulid::new(), quantity: 1 }],
    )
    .await;

    let (status, v) = post_json(
        &format!("{base}/api/appointments"),
        &book_body(customer, stylist, service, T0 + 9 * H, T0 + 10 * H),
    )
    .await;
    assert_eq!(status, 500);
    assert_eq!(v["status"], "error");
}

#[tokio::test]
async fn status_updates_walk_the_state_machine() {
    let (base, engine) = start_test_server().await;
    let customer = add_customer(&engine).await;
    let stylist = add_staff(&engine, "Alice Styles", SkillLevel::Expert).await;
    let service = add_service(&engine, "Basic Haircut", 30, SkillLevel::Basic, vec![]).await;

    let (_, v) = post_json(
        &format!("{base}/api/appointments"),
        &book_body(customer, stylist, service, T0 + 9 * H, T0 + 10 * H),
    )
    .await;
    let id = v["data"]["appointment"]["id"].as_str().unwrap().to_string();
    let url = format!("{base}/api/appointments/{id}/status");

    let (status, v) = patch_json(&url, &json!({ "status": "Confirmed" })).await;
    assert_eq!(status, 200);
    assert_eq!(v["data"]["appointment"]["status"], "Confirmed");

    let (status, v) = patch_json(&url, &json!({ "status": "Completed" })).await;
    assert_eq!(status, 200);
    assert_eq!(v["data"]["appointment"]["status"], "Completed");

    // Completed is terminal
    let (status, v) = patch_json(&url, &json!({ "status": "Cancelled" })).await;
    assert_eq!(status, 400);
    assert_eq!(
        v["message"],
        "Cannot transition appointment from Completed to Cancelled"
    );
}

#[tokio::test]
async fn bad_appointment_ids_are_rejected() {
    let (base, _engine) = start_test_server().await;

    let (status, v) = patch_json(
        &format!("{base}/api/appointments/{}/status", Ulid::new()),
        &json!({ "status": "Confirmed" }),
    )
    .await;
    assert_eq!(status, 404);
    assert_eq!(v["message"], "Appointment not found");

    let (status, v) = patch_json(
        &format!("{base}/api/appointments/not-a-ulid/status"),
        &json!({ "status": "Confirmed" }),
    )
    .await;
    assert_eq!(status, 400);
    assert_eq!(v["message"], "Invalid id: not-a-ulid");
}

#[tokio::test]
async fn cancelling_frees_the_slot_for_rebooking() {
    let (base, engine) = start_test_server().await;
    let customer = add_customer(&engine).await;
    let stylist = add_staff(&engine, "Alice Styles", SkillLevel::Expert).await;
    let service = add_service(&engine, "Basic Haircut", 30, SkillLevel::Basic, vec![]).await;
    let body = book_body(customer, stylist, service, T0 + 9 * H, T0 + 10 * H);

    let (_, v) = post_json(&format!("{base}/api/appointments"), &body).await;
    let id = v["data"]["appointment"]["id"].as_str().unwrap().to_string();

    let (status, _) = patch_json(
        &format!("{base}/api/appointments/{id}/status"),
        &json!({ "status": "Cancelled" }),
    )
    .await;
    assert_eq!(status, 200);

    let (status, _) = post_json(&format!("{base}/api/appointments"), &body).await;
    assert_eq!(status, 201);
}

#[tokio::test]
async fn appointment_list_includes_cancelled() {
    let (base, engine) = start_test_server().await;
    let customer = add_customer(&engine).await;
    let stylist = add_staff(&engine, "Alice Styles", SkillLevel::Expert).await;
    let service = add_service(&engine, "Basic Haircut", 30, SkillLevel::Basic, vec![]).await;

    let a = engine
        .book_appointment(chairtime::model::BookingRequest {
            customer,
            stylist,
            service,
            start_time: T0 + 9 * H,
            end_time: T0 + 10 * H,
            notes: None,
        })
        .await
        .unwrap();
    engine.cancel_appointment(a.id).await.unwrap();
    engine
        .book_appointment(chairtime::model::BookingRequest {
            customer,
            stylist,
            service,
            start_time: T0 + 11 * H,
            end_time: T0 + 12 * H,
            notes: None,
        })
        .await
        .unwrap();

    let (status, v) = get_json(&format!("{base}/api/appointments")).await;
    assert_eq!(status, 200);
    assert_eq!(v["results"], 2);
    let statuses: Vec<&str> = v["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["status"].as_str().unwrap())
        .collect();
    assert!(statuses.contains(&"Cancelled"));
    assert!(statuses.contains(&"Pending"));
}

#[tokio::test]
async fn data_listings_project_the_catalog() {
    let (base, engine) = start_test_server().await;
    add_customer(&engine).await;
    add_staff(&engine, "Alice Styles", SkillLevel::Expert).await;
    add_staff(&engine, "Bob Cutter", SkillLevel::Basic).await;
    let dye = add_item(&engine, "Matrix SoColor Red", "DYE-RED-001", 120, "ml").await;
    add_service(&engine, "Basic Haircut", 30, SkillLevel::Basic, vec![]).await;
    add_service(
        &engine,
        "Luxury Hair Dye",
        150,
        SkillLevel::Expert,
        vec![Consumable { item_id: dye, quantity: 100 }],
    )
    .await;

    let (status, v) = get_json(&format!("{base}/api/data/services")).await;
    assert_eq!(status, 200);
    assert_eq!(v["results"], 2);
    let services = v["data"].as_array().unwrap();
    let dye_service = services
        .iter()
        .find(|s| s["name"] == "Luxury Hair Dye")
        .unwrap();
    assert_eq!(dye_service["price"], 150);
    assert_eq!(dye_service["requiredSkillLevel"], "Expert");
    // The recipe is internal; listings never expose consumables.
    assert!(dye_service.get("consumables").is_none());

    let (_, v) = get_json(&format!("{base}/api/data/stylists")).await;
    assert_eq!(v["results"], 2);
    let alice = v["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["name"] == "Alice Styles")
        .unwrap()
        .clone();
    assert_eq!(alice["skillLevel"], "Expert");
    assert!(alice.get("email").is_none());

    let (_, v) = get_json(&format!("{base}/api/data/customers")).await;
    assert_eq!(v["results"], 1);
    assert_eq!(v["data"][0]["email"], "demo@customer.test");

    let (_, v) = get_json(&format!("{base}/api/data/inventory")).await;
    assert_eq!(v["results"], 1);
    assert_eq!(v["data"][0]["itemName"], "Matrix SoColor Red");
    assert_eq!(v["data"][0]["stockLevel"], 120);
    assert_eq!(v["data"][0]["sku"], "DYE-RED-001");
}

#[tokio::test]
async fn dashboard_reports_revenue_and_top_stylist() {
    let (base, engine) = start_test_server().await;

    // Empty salon first
    let (status, v) = get_json(&format!("{base}/api/dashboard/stats")).await;
    assert_eq!(status, 200);
    assert_eq!(v["data"]["totalRevenue"], 0);
    assert_eq!(v["data"]["totalAppointments"], 0);
    assert_eq!(v["data"]["topStylist"], "N/A");
    assert_eq!(v["data"]["lowStockCount"], 0);

    let customer = add_customer(&engine).await;
    let alice = add_staff(&engine, "Alice Styles", SkillLevel::Expert).await;
    let bob = add_staff(&engine, "Bob Cutter", SkillLevel::Expert).await;
    let keratin = add_item(&engine, "Gold Keratin Tub", "TRT-KER-001", 5, "tubs").await;
    let haircut = add_service(&engine, "Basic Haircut", 30, SkillLevel::Basic, vec![]).await;
    let treatment = add_service(
        &engine,
        "Keratin Treatment",
        250,
        SkillLevel::Expert,
        vec![Consumable { item_id: keratin, quantity: 1 }],
    )
    .await;

    for (stylist, service, start) in [
        (alice, haircut, T0 + 9 * H),
        (alice, haircut, T0 + 11 * H),
        (bob, treatment, T0 + 9 * H),
    ] {
        let (status, _) = post_json(
            &format!("{base}/api/appointments"),
            &book_body(customer, stylist, service, start, start + H),
        )
        .await;
        assert_eq!(status, 201);
    }

    let (_, v) = get_json(&format!("{base}/api/dashboard/stats")).await;
    assert_eq!(v["data"]["totalRevenue"], 310);
    assert_eq!(v["data"]["totalAppointments"], 3);
    assert_eq!(v["data"]["topStylist"], "Alice Styles");
    // The booking took the keratin from 5 to 4, under the threshold
    assert_eq!(v["data"]["lowStockCount"], 1);
    assert_eq!(v["data"]["lowStockItems"][0]["itemName"], "Gold Keratin Tub");
    assert_eq!(v["data"]["lowStockItems"][0]["stockLevel"], 4);
}

#[tokio::test]
async fn concurrent_bookings_over_http_one_wins() {
    let (base, engine) = start_test_server().await;
    let customer = add_customer(&engine).await;
    let stylist = add_staff(&engine, "Alice Styles", SkillLevel::Expert).await;
    let service = add_service(&engine, "Basic Haircut", 30, SkillLevel::Basic, vec![]).await;

    let mut handles = Vec::new();
    for _ in 0..6 {
        let url = format!("{base}/api/appointments");
        let body = book_body(customer, stylist, service, T0 + 9 * H, T0 + 10 * H);
        handles.push(tokio::spawn(async move { post_json(&url, &body).await.0 }));
    }

    let mut created = 0;
    let mut conflicts = 0;
    for h in handles {
        match h.await.unwrap() {
            201 => created += 1,
            409 => conflicts += 1,
            other => panic!("unexpected status {other}"),
        }
    }
    assert_eq!(created, 1);
    assert_eq!(conflicts, 5);
}
