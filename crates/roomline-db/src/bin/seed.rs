//! # Seed Data Generator
//!
//! Populates the database with test catalog, promotion and inventory
//! data for development.
//!
//! ## Usage
//! ```bash
//! # Generate the default catalog (~200 rooms)
//! cargo run -p roomline-db --bin seed
//!
//! # Generate a custom amount
//! cargo run -p roomline-db --bin seed -- --count 500
//!
//! # Specify database path
//! cargo run -p roomline-db --bin seed -- --db ./data/roomline.db
//! ```
//!
//! ## Generated Data
//! - Two sales channels: `web` (USD) and `mobile` (USD)
//! - Hotels across a handful of countries, each stocking every variant
//! - Rooms spread over categories (city, beach, mountain, airport)
//! - Room variants (standard / deluxe / suite) with channel prices
//! - A seasonal percentage promotion and a fixed-amount promotion
//! - A full catalogue recalculation at the end, so `discounted_price_cents`
//!   is populated and browsable immediately

use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::env;

use roomline_core::{
    Channel, DiscountKind, Hotel, PromotionRule, Room, RoomChannelListing, RoomVariant, Stock,
    VariantChannelListing,
};
use roomline_db::repository::catalog::generate_id;
use roomline_db::{Database, DbConfig};

/// Room name stems per category.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "city",
        &[
            "Skyline Double",
            "Metro Twin",
            "Downtown Studio",
            "Plaza King",
            "Riverside Queen",
            "Old Town Loft",
        ],
    ),
    (
        "beach",
        &[
            "Sea View Double",
            "Beachfront Suite",
            "Dune Bungalow",
            "Promenade Twin",
            "Lighthouse King",
        ],
    ),
    (
        "mountain",
        &[
            "Alpine Lodge Room",
            "Summit Suite",
            "Valley View Twin",
            "Chalet Double",
        ],
    ),
    (
        "airport",
        &["Transit Single", "Layover Double", "Terminal Twin"],
    ),
];

/// Variant tiers with their price add-on in cents.
const TIERS: &[(&str, i64)] = &[("Standard", 0), ("Deluxe", 3500), ("Suite", 9000)];

const COUNTRIES: &[(&str, &str)] = &[
    ("PT", "Lisbon Grand"),
    ("PT", "Porto Riverside"),
    ("ES", "Barcelona Central"),
    ("FR", "Paris Nord"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./roomline_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Roomline Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of rooms to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./roomline_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Roomline Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Rooms:    {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    if db.catalog().get_channel_by_slug("web").await?.is_some() {
        println!("⚠ Database already seeded (channel 'web' exists)");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Channels
    let mut channel_ids = Vec::new();
    for slug in ["web", "mobile"] {
        let channel = Channel {
            id: generate_id(),
            slug: slug.to_string(),
            name: format!("{slug} storefront"),
            currency: "USD".to_string(),
        };
        db.catalog().insert_channel(&channel).await?;
        channel_ids.push(channel.id);
    }
    println!("✓ Created {} channels", channel_ids.len());

    // Hotels
    let mut hotel_ids = Vec::new();
    for (country, name) in COUNTRIES {
        let hotel = Hotel {
            id: generate_id(),
            slug: name.to_lowercase().replace(' ', "-"),
            name: name.to_string(),
            country: country.to_string(),
        };
        db.stocks().insert_hotel(&hotel).await?;
        hotel_ids.push(hotel.id);
    }
    println!("✓ Created {} hotels", hotel_ids.len());

    // Rooms, variants, prices, stock
    println!();
    println!("Generating rooms...");
    let start = std::time::Instant::now();
    let now = Utc::now();
    let mut generated = 0usize;

    'outer: for (category, names) in CATEGORIES {
        for (name_idx, name) in names.iter().enumerate() {
            if generated >= count {
                break 'outer;
            }

            let room = Room {
                id: generate_id(),
                name: format!("{name} #{generated}"),
                category_id: Some((*category).to_string()),
                created_at: now,
                updated_at: now,
            };
            db.catalog().insert_room(&room).await?;

            // Every third room also joins the "featured" collection.
            if generated % 3 == 0 {
                db.catalog().add_to_collection(&room.id, "featured").await?;
            }

            // Deterministic base price: 80-260 per night depending on
            // category and name position.
            let base_cents = 8000 + (name_idx as i64 * 1700) % 18000;

            for (tier, addon) in TIERS {
                let variant = RoomVariant {
                    id: generate_id(),
                    room_id: room.id.clone(),
                    sku: format!("{}-{}-{}", category.to_uppercase(), generated, tier),
                    name: (*tier).to_string(),
                };
                db.catalog().insert_variant(&variant).await?;

                for (ch_idx, channel_id) in channel_ids.iter().enumerate() {
                    // Mobile runs slightly cheaper.
                    let price_cents = base_cents + addon - (ch_idx as i64 * 300);
                    db.catalog()
                        .upsert_variant_listing(&VariantChannelListing {
                            id: generate_id(),
                            variant_id: variant.id.clone(),
                            channel_id: channel_id.clone(),
                            price_cents,
                            cost_price_cents: Some(price_cents / 2),
                        })
                        .await?;
                }

                for hotel_id in &hotel_ids {
                    db.stocks()
                        .insert_stock(&Stock {
                            id: generate_id(),
                            hotel_id: hotel_id.clone(),
                            variant_id: variant.id.clone(),
                            quantity: 2 + (generated as i64 % 9),
                        })
                        .await?;
                }
            }

            for channel_id in &channel_ids {
                db.catalog()
                    .insert_room_listing(&RoomChannelListing {
                        id: generate_id(),
                        room_id: room.id.clone(),
                        channel_id: channel_id.clone(),
                        discounted_price_cents: None,
                        is_published: true,
                        available_for_purchase: Some(now),
                    })
                    .await?;
            }

            generated += 1;
            if generated % 50 == 0 {
                println!("  Generated {} rooms...", generated);
            }
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} rooms in {:?}", generated, elapsed);

    // Promotions: 15% off beach rooms, 20.00 off the featured collection.
    let beach_sale = PromotionRule {
        id: generate_id(),
        name: "Summer Beach Sale".to_string(),
        kind: DiscountKind::Percentage,
        starts_at: now - Duration::days(1),
        ends_at: Some(now + Duration::days(30)),
        room_ids: HashSet::new(),
        category_ids: HashSet::from(["beach".to_string()]),
        collection_ids: HashSet::new(),
        channel_values: channel_ids
            .iter()
            .map(|id| (id.clone(), 1500))
            .collect::<HashMap<_, _>>(),
    };
    db.discounts().insert_rule(&beach_sale).await?;

    let featured_deal = PromotionRule {
        id: generate_id(),
        name: "Featured Rooms Deal".to_string(),
        kind: DiscountKind::Fixed,
        starts_at: now - Duration::days(1),
        ends_at: None,
        room_ids: HashSet::new(),
        category_ids: HashSet::new(),
        collection_ids: HashSet::from(["featured".to_string()]),
        channel_values: channel_ids
            .iter()
            .map(|id| (id.clone(), 2000))
            .collect::<HashMap<_, _>>(),
    };
    db.discounts().insert_rule(&featured_deal).await?;
    println!("✓ Created 2 promotion rules");

    // Populate the discounted-price cache for everything just created.
    println!();
    println!("Recalculating discounted prices...");
    let filter = roomline_core::CatalogueFilter {
        room_ids: vec![],
        category_ids: CATEGORIES.iter().map(|(c, _)| (*c).to_string()).collect(),
        collection_ids: vec![],
    };
    let written = db.pricing().recalculate_catalogue(&filter).await?;
    println!("  Wrote {} channel listings", written);

    println!();
    println!("✓ Seed complete!");
    Ok(())
}
