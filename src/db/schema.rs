pub const SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

-- users table (one row per identity-provider account)
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    email TEXT NOT NULL UNIQUE,
    provider TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- items table (a creator's stream is every item with their owner_id)
CREATE TABLE IF NOT EXISTS items (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    url TEXT NOT NULL,
    extracted_id TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT 'youtube',
    title TEXT NOT NULL,
    small_img TEXT NOT NULL,
    big_img TEXT NOT NULL,
    upvotes INTEGER NOT NULL DEFAULT 0,
    downvotes INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    UNIQUE(owner_id, extracted_id)
);

CREATE INDEX IF NOT EXISTS idx_items_owner_id ON items(owner_id);

-- votes table (the ledger: at most one row per voter per item)
CREATE TABLE IF NOT EXISTS votes (
    voter_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    item_id TEXT NOT NULL REFERENCES items(id) ON DELETE CASCADE,
    is_up INTEGER NOT NULL,
    voted_at TEXT NOT NULL,
    PRIMARY KEY(voter_id, item_id)
);

CREATE INDEX IF NOT EXISTS idx_votes_item_id ON votes(item_id);
"#;
