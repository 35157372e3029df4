//! Schema definitions for the libSQL backend.
//!
//! Five collections, one table each. Enumerated labels are guarded with
//! CHECK constraints; foreign keys are plain TEXT columns with no FOREIGN KEY
//! clause, so a dangling reference is representable and the join views have to
//! cope with it. Order line items live in a JSON array column.

/// A single versioned schema step.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const MIGRATION_TABLE_DDL: &str = "\
CREATE TABLE IF NOT EXISTS _migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);
";

pub static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "initial_schema",
    sql: SCHEMA_V1,
}];

const SCHEMA_V1: &str = "\
-- users: internal staff, looked up by email or by full name
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    surname TEXT NOT NULL,
    email TEXT NOT NULL,
    role TEXT NOT NULL,
    active INTEGER NOT NULL CHECK (active IN (0, 1)),
    created_at INTEGER NOT NULL,
    updated_at INTEGER
);
CREATE INDEX IF NOT EXISTS idx_users_email ON users (email);
CREATE INDEX IF NOT EXISTS idx_users_fullname ON users (name, surname);

-- clients
CREATE TABLE IF NOT EXISTS clients (
    id TEXT PRIMARY KEY,
    full_name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT NOT NULL,
    address TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('active', 'inactive'))
);
CREATE INDEX IF NOT EXISTS idx_clients_email ON clients (email);
CREATE INDEX IF NOT EXISTS idx_clients_status ON clients (status);

-- products
CREATE TABLE IF NOT EXISTS products (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    price REAL NOT NULL,
    stock INTEGER NOT NULL,
    sku TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    active INTEGER NOT NULL CHECK (active IN (0, 1))
);
CREATE INDEX IF NOT EXISTS idx_products_sku ON products (sku);
CREATE INDEX IF NOT EXISTS idx_products_active ON products (active);

-- orders: client_id -> clients.id, items is a JSON array of line items
CREATE TABLE IF NOT EXISTS orders (
    id TEXT PRIMARY KEY,
    client_id TEXT NOT NULL,
    items TEXT NOT NULL DEFAULT '[]',
    total_amount REAL NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('pending', 'paid', 'shipped', 'delivered', 'cancelled')),
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_orders_client ON orders (client_id);
CREATE INDEX IF NOT EXISTS idx_orders_status ON orders (status);

-- claims: client_id -> clients.id, order_id -> orders.id
CREATE TABLE IF NOT EXISTS claims (
    id TEXT PRIMARY KEY,
    client_id TEXT NOT NULL,
    order_id TEXT NOT NULL,
    claim_type TEXT NOT NULL CHECK (claim_type IN ('refund', 'damaged', 'wrong_item', 'late_delivery', 'other')),
    description TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('open', 'in_review', 'resolved', 'rejected')),
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_claims_client ON claims (client_id);
CREATE INDEX IF NOT EXISTS idx_claims_order ON claims (order_id);
CREATE INDEX IF NOT EXISTS idx_claims_status ON claims (status);
";

/// Tables the assistant reads from, in dependency order.
pub const COLLECTIONS: &[&str] = &["users", "clients", "products", "orders", "claims"];
