//! Demo salon data for first runs: a handful of stylists, services, and
//! inventory items so the API answers with something meaningful before any
//! real data exists. Skipped whenever the engine already holds state.

use crate::engine::{BookingError, Engine};
use crate::model::{Consumable, Role, SkillLevel};

pub async fn seed_demo_data(engine: &Engine) -> Result<(), BookingError> {
    if !engine.is_empty() {
        tracing::warn!("engine already holds data; skipping demo seed");
        return Ok(());
    }

    // Inventory first: services reference the item ids. Cost is cents per
    // unit; expiry timestamps are UTC midnights.
    let red_dye = engine
        .create_inventory_item(
            "Matrix SoColor Red".into(),
            "DYE-RED-001".into(),
            120,
            "ml".into(),
            500,
            Some(50),
            Some(1_798_675_200_000), // 2026-12-31
        )
        .await?;
    engine
        .create_inventory_item(
            "Electric Blue Dye".into(),
            "DYE-BLU-001".into(),
            800,
            "ml".into(),
            200,
            Some(60),
            Some(1_814_313_600_000), // 2027-06-30
        )
        .await?;
    let shampoo = engine
        .create_inventory_item(
            "Premium Argan Shampoo".into(),
            "SHAM-ARG-001".into(),
            100,
            "bottles".into(),
            10,
            Some(1_500),
            Some(1_831_507_200_000), // 2028-01-15
        )
        .await?;
    // Seeded at exactly the low-stock threshold, so it only shows up on the
    // dashboard once a treatment consumes a tub.
    let keratin = engine
        .create_inventory_item(
            "Gold Keratin Tub".into(),
            "TRT-KER-001".into(),
            5,
            "tubs".into(),
            8,
            Some(15_000),
            Some(1_787_184_000_000), // 2026-08-20
        )
        .await?;
    let beard_oil = engine
        .create_inventory_item(
            "Sandalwood Beard Oil".into(),
            "GRO-OIL-001".into(),
            50,
            "bottles".into(),
            15,
            Some(2_500),
            Some(1_861_920_000_000), // 2029-01-01
        )
        .await?;
    let face_mask = engine
        .create_inventory_item(
            "Charcoal Face Mask".into(),
            "SKIN-MSK-001".into(),
            200,
            "packets".into(),
            50,
            Some(500),
            Some(1_778_803_200_000), // 2026-05-15
        )
        .await?;

    engine
        .create_person(
            "Khushi Admin".into(),
            "owner@salon.com".into(),
            None,
            Role::Owner,
            None,
            None,
        )
        .await?;
    engine
        .create_person(
            "Alice Styles".into(),
            "alice@salon.com".into(),
            None,
            Role::Staff,
            Some(SkillLevel::Expert),
            Some(40),
        )
        .await?;
    engine
        .create_person(
            "Bob Cutter".into(),
            "bob@salon.com".into(),
            None,
            Role::Staff,
            Some(SkillLevel::Basic),
            Some(20),
        )
        .await?;
    engine
        .create_person(
            "Elena Vogue".into(),
            "elena@salon.com".into(),
            None,
            Role::Staff,
            Some(SkillLevel::Expert),
            Some(50),
        )
        .await?;
    engine
        .create_person(
            "Davina Smooth".into(),
            "davina@salon.com".into(),
            None,
            Role::Staff,
            Some(SkillLevel::Intermediate),
            Some(30),
        )
        .await?;
    engine
        .create_person(
            "Mike Razor".into(),
            "mike@salon.com".into(),
            None,
            Role::Staff,
            Some(SkillLevel::Intermediate),
            Some(30),
        )
        .await?;
    engine
        .create_person(
            "Demo Customer".into(),
            "demo@customer.com".into(),
            None,
            Role::Customer,
            None,
            None,
        )
        .await?;

    // Prices are whole dollars.
    engine
        .create_service(
            "Luxury Hair Dye".into(),
            Some("Full head coloring with premium organic dye.".into()),
            150,
            90,
            SkillLevel::Expert,
            vec![Consumable { item_id: red_dye.id, quantity: 100 }],
        )
        .await?;
    engine
        .create_service(
            "Basic Haircut".into(),
            Some("Standard trim and styling.".into()),
            30,
            30,
            SkillLevel::Basic,
            vec![],
        )
        .await?;
    engine
        .create_service(
            "Wash & Blow Dry".into(),
            Some("Relaxing wash with premium shampoo.".into()),
            45,
            45,
            SkillLevel::Basic,
            vec![Consumable { item_id: shampoo.id, quantity: 1 }],
        )
        .await?;
    engine
        .create_service(
            "Keratin Treatment".into(),
            Some("Smoothing treatment for frizz-free hair.".into()),
            250,
            120,
            SkillLevel::Expert,
            vec![Consumable { item_id: keratin.id, quantity: 1 }],
        )
        .await?;
    engine
        .create_service(
            "Beard Grooming".into(),
            Some("Shape up and oil treatment.".into()),
            40,
            30,
            SkillLevel::Intermediate,
            vec![Consumable { item_id: beard_oil.id, quantity: 1 }],
        )
        .await?;
    engine
        .create_service(
            "Charcoal Detox Facial".into(),
            Some("Deep cleansing face mask.".into()),
            75,
            60,
            SkillLevel::Intermediate,
            vec![Consumable { item_id: face_mask.id, quantity: 1 }],
        )
        .await?;

    let (people, services, items, _) = engine.entity_counts();
    tracing::info!(people, services, items, "seeded demo salon data");
    Ok(())
}
