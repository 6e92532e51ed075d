// SPDX-License-Identifier: MPL-2.0

/// SQL schema for the local backend database
pub const SCHEMA: &str = r#"
PRAGMA user_version = 1;

-- profiles: one row per identity, username claimed at most once
CREATE TABLE IF NOT EXISTS profiles (
    id TEXT PRIMARY KEY,
    email TEXT,
    username TEXT NOT NULL UNIQUE,
    bio TEXT,
    avatar_url TEXT,
    plan TEXT NOT NULL DEFAULT 'free',
    packs_count INTEGER NOT NULL DEFAULT 0,
    followers_count INTEGER NOT NULL DEFAULT 0,
    total_likes_received INTEGER NOT NULL DEFAULT 0,
    total_sales INTEGER NOT NULL DEFAULT 0,
    total_plays_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

-- packs: soft-deleted rows stay so likes can still reference them
CREATE TABLE IF NOT EXISTS packs (
    id TEXT PRIMARY KEY,
    user_id TEXT NOT NULL,
    title TEXT NOT NULL,
    price INTEGER NOT NULL DEFAULT 0 CHECK (price >= 0),
    cover_url TEXT,
    downloads_count INTEGER NOT NULL DEFAULT 0,
    likes_count INTEGER NOT NULL DEFAULT 0,
    genre TEXT,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_packs_owner ON packs(user_id, created_at DESC);

-- pack_likes: no foreign key, the pack may be gone
CREATE TABLE IF NOT EXISTS pack_likes (
    user_id TEXT NOT NULL,
    pack_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (user_id, pack_id)
);

CREATE INDEX IF NOT EXISTS idx_pack_likes_user ON pack_likes(user_id, created_at DESC);

-- pack_plays: append-only
CREATE TABLE IF NOT EXISTS pack_plays (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    pack_id TEXT NOT NULL,
    played_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pack_plays_pack ON pack_plays(pack_id, played_at);

-- pack_downloads: feeds the remaining-downloads quota
CREATE TABLE IF NOT EXISTS pack_downloads (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id TEXT NOT NULL,
    pack_id TEXT NOT NULL,
    downloaded_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pack_downloads_user ON pack_downloads(user_id, downloaded_at);

-- objects: bucketed blob storage
CREATE TABLE IF NOT EXISTS objects (
    bucket TEXT NOT NULL,
    path TEXT NOT NULL,
    content_type TEXT NOT NULL,
    data BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (bucket, path)
);
"#;
