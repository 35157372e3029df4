//! Demo dataset for local development.
//!
//! Inserts a handful of users, clients, products, orders and claims whose
//! references all resolve. Orders carry line-item snapshots with subtotals
//! and totals that add up.

use chrono::Utc;
use serde::Serialize;

use crate::db::{
    ClaimStatus, ClaimType, ClientStatus, Database, LineItem, NewClaimParams, NewClientParams,
    NewOrderParams, NewUserParams, OrderStatus, ProductParams, ProductRecord,
};
use crate::error::DatabaseError;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// What a seed run inserted.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct SeedReport {
    pub users: usize,
    pub clients: usize,
    pub products: usize,
    pub orders: usize,
    pub claims: usize,
    /// True when the store already held data and nothing was written.
    pub skipped: bool,
}

/// Populate an empty store. A store that already has users or products is
/// left untouched.
pub async fn seed_demo_data(db: &dyn Database) -> Result<SeedReport, DatabaseError> {
    if !db.list_users().await?.is_empty() || !db.list_products().await?.is_empty() {
        tracing::info!("Store already holds data, skipping seed");
        return Ok(SeedReport {
            skipped: true,
            ..SeedReport::default()
        });
    }

    let now = Utc::now().timestamp_millis();
    let ago = |days: i64| now - days * DAY_MS;
    let mut report = SeedReport::default();

    let users = [
        ("Laura", "Méndez", "laura.mendez@empresa.com", "admin", true),
        ("Carlos", "Ruiz", "carlos.ruiz@empresa.com", "ventas", true),
        ("Ana", "Torres", "ana.torres@empresa.com", "soporte", true),
        ("Jorge", "Salinas", "jorge.salinas@empresa.com", "ventas", false),
    ];
    for (i, (name, surname, email, role, active)) in users.into_iter().enumerate() {
        db.insert_user(&NewUserParams {
            name: name.to_string(),
            surname: surname.to_string(),
            email: email.to_string(),
            role: role.to_string(),
            active,
            created_at: ago(90 - i as i64),
            updated_at: None,
        })
        .await?;
        report.users += 1;
    }

    let clients = [
        (
            "Distribuidora Andina S.A.",
            "compras@andina.com",
            "+51 1 555 0101",
            "Av. Arequipa 1200, Lima",
            ClientStatus::Active,
        ),
        (
            "Comercial del Norte",
            "contacto@cnorte.com",
            "+52 81 5550 2020",
            "Calle Morelos 45, Monterrey",
            ClientStatus::Active,
        ),
        (
            "Grupo Pampa Ltda.",
            "admin@grupopampa.com",
            "+54 11 5550 3030",
            "Av. Corrientes 900, Buenos Aires",
            ClientStatus::Inactive,
        ),
    ];
    let mut client_ids = Vec::new();
    for (i, (full_name, email, phone, address, status)) in clients.into_iter().enumerate() {
        let id = db
            .insert_client(&NewClientParams {
                full_name: full_name.to_string(),
                email: email.to_string(),
                phone: phone.to_string(),
                address: address.to_string(),
                created_at: ago(60 - i as i64),
                status,
            })
            .await?;
        client_ids.push(id);
        report.clients += 1;
    }

    let products = [
        ("Teclado mecánico", "Teclado mecánico con switches táctiles", 89.90, 40, "TEC-001"),
        ("Mouse inalámbrico", "Mouse ergonómico de 2.4 GHz", 24.50, 120, "MOU-002"),
        ("Monitor 27\"", "Monitor IPS 27 pulgadas 1440p", 329.00, 15, "MON-003"),
        ("Base para laptop", "Soporte de aluminio regulable", 39.99, 0, "BAS-004"),
    ];
    let mut catalog: Vec<ProductRecord> = Vec::new();
    for (i, (name, description, price, stock, sku)) in products.into_iter().enumerate() {
        let params = ProductParams {
            name: name.to_string(),
            description: description.to_string(),
            price,
            stock,
            sku: sku.to_string(),
            created_at: ago(45 - i as i64),
            active: stock > 0,
        };
        let id = db.insert_product(&params).await?;
        catalog.push(ProductRecord {
            id,
            name: params.name,
            description: params.description,
            price: params.price,
            stock: params.stock,
            sku: params.sku,
            created_at: params.created_at,
            active: params.active,
        });
        report.products += 1;
    }

    // (client index, [(product index, quantity)], status, age in days)
    let orders: [(usize, &[(usize, i64)], OrderStatus, i64); 4] = [
        (0, &[(0, 2), (1, 3)], OrderStatus::Delivered, 20),
        (1, &[(2, 1)], OrderStatus::Shipped, 7),
        (0, &[(1, 10)], OrderStatus::Paid, 3),
        (2, &[(0, 1), (2, 1)], OrderStatus::Cancelled, 30),
    ];
    let mut order_ids = Vec::new();
    for (client, lines, status, days) in orders {
        let items: Vec<LineItem> = lines
            .iter()
            .map(|&(product, quantity)| line_item(&catalog[product], quantity))
            .collect();
        let id = db
            .insert_order(&NewOrderParams {
                client_id: client_ids[client],
                total_amount: order_total(&items),
                items,
                status,
                created_at: ago(days),
            })
            .await?;
        order_ids.push((client_ids[client], id));
        report.orders += 1;
    }

    let claims = [
        (
            0,
            ClaimType::Damaged,
            "Un teclado llegó con una tecla suelta.",
            ClaimStatus::InReview,
            15,
        ),
        (
            1,
            ClaimType::LateDelivery,
            "El monitor no llegó en la fecha comprometida.",
            ClaimStatus::Open,
            2,
        ),
        (
            3,
            ClaimType::Refund,
            "Solicitud de reembolso por pedido cancelado.",
            ClaimStatus::Resolved,
            25,
        ),
    ];
    for (order, claim_type, description, status, days) in claims {
        let (client_id, order_id) = order_ids[order];
        db.insert_claim(&NewClaimParams {
            client_id,
            order_id,
            claim_type,
            description: description.to_string(),
            status,
            created_at: ago(days),
        })
        .await?;
        report.claims += 1;
    }

    tracing::info!(
        users = report.users,
        clients = report.clients,
        products = report.products,
        orders = report.orders,
        claims = report.claims,
        "Seeded demo data"
    );
    Ok(report)
}

fn line_item(product: &ProductRecord, quantity: i64) -> LineItem {
    LineItem {
        product_id: product.id,
        product_name: product.name.clone(),
        quantity,
        price_at_purchase: product.price,
        subtotal: round_cents(product.price * quantity as f64),
    }
}

fn order_total(items: &[LineItem]) -> f64 {
    round_cents(items.iter().map(|item| item.subtotal).sum())
}

fn round_cents(amount: f64) -> f64 {
    (amount * 100.0).round() / 100.0
}
