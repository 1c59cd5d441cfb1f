//! `SQLite` schema definitions for destinasi.
//!
//! Timestamps are RFC 3339 text. Destination ids are UUID strings; every
//! other table uses integer row ids.

/// SQL statement to create the users table.
pub const CREATE_USERS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL DEFAULT 'admin' CHECK (role IN ('admin', 'superadmin')),
    phone_number TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the sessions table. Only token hashes are kept.
pub const CREATE_SESSIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS sessions (
    token_hash TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL,
    expires_at TEXT NOT NULL
)
";

/// SQL statement to create the categories table.
pub const CREATE_CATEGORIES_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    img TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the destinations table.
pub const CREATE_DESTINATIONS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS destinations (
    id TEXT PRIMARY KEY,
    pic_id INTEGER NOT NULL REFERENCES users(id),
    name TEXT NOT NULL,
    thumb_image TEXT,
    imagekit_file_id TEXT,
    content TEXT NOT NULL,
    facility TEXT NOT NULL,
    lat REAL NOT NULL,
    lon REAL NOT NULL,
    address TEXT,
    operating_hours TEXT,
    published INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// SQL statement to create the destination/category link table.
pub const CREATE_DESTINATION_CATEGORY_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS destination_category (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    destination_id TEXT NOT NULL REFERENCES destinations(id),
    category_id INTEGER NOT NULL REFERENCES categories(id),
    UNIQUE (destination_id, category_id)
)
";

/// SQL statement to create the testimonials table.
pub const CREATE_TESTIMONIALS_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS testimonials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    destination_id TEXT NOT NULL REFERENCES destinations(id),
    name TEXT NOT NULL,
    comment TEXT NOT NULL,
    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
";

/// Index for listing a PIC's destinations.
pub const CREATE_DESTINATIONS_PIC_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_destinations_pic ON destinations(pic_id)
";

/// Index for the public catalog.
pub const CREATE_DESTINATIONS_PUBLISHED_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_destinations_published ON destinations(published, created_at)
";

/// Index for category lookups from the link table.
pub const CREATE_LINK_CATEGORY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_destination_category_category ON destination_category(category_id)
";

/// Index for rating aggregation.
pub const CREATE_TESTIMONIALS_DESTINATION_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_testimonials_destination ON testimonials(destination_id)
";

/// Index for session expiry sweeps.
pub const CREATE_SESSIONS_EXPIRY_INDEX: &str = r"
CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)
";

/// SQL statement to create the metadata table for storing key-value pairs.
pub const CREATE_METADATA_TABLE: &str = r"
CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
)
";

/// All schema creation statements in order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    CREATE_USERS_TABLE,
    CREATE_SESSIONS_TABLE,
    CREATE_CATEGORIES_TABLE,
    CREATE_DESTINATIONS_TABLE,
    CREATE_DESTINATION_CATEGORY_TABLE,
    CREATE_TESTIMONIALS_TABLE,
    CREATE_DESTINATIONS_PIC_INDEX,
    CREATE_DESTINATIONS_PUBLISHED_INDEX,
    CREATE_LINK_CATEGORY_INDEX,
    CREATE_TESTIMONIALS_DESTINATION_INDEX,
    CREATE_SESSIONS_EXPIRY_INDEX,
    CREATE_METADATA_TABLE,
];
