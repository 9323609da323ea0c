//! Shared fixtures: a `user` kind with unique fields and a `post` kind
//! referencing it, both over one in-memory store.

#![allow(dead_code)]

use std::sync::Arc;

use columndao::dao::{EntityDao, RandomUuidGenerator};
use columndao::driver::MemoryDriver;
use columndao::schema::EntityDefinition;
use serde_json::json;

pub fn user_definition() -> EntityDefinition {
    EntityDefinition::from_json(
        &json!({
            "schema": {
                "kind": "user",
                "fields": {
                    "id": { "type": "identifier" },
                    "created_at": { "type": "timestamp" },
                    "email": { "type": "text", "unique": true, "queryable": true, "required": true },
                    "handle": { "type": "text", "unique": true, "queryable": true },
                    "name": { "type": "text", "queryable": true },
                    "bio": { "type": "text" },
                    "tags": { "type": "collection" },
                    "last_seen": { "type": "timestamp" }
                }
            },
            "statements": {
                "insert": {
                    "query": "INSERT INTO users (id, created_at, email, handle, name, bio, tags, last_seen) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    "params": ["id", "created_at", "email", "handle", "name", "bio", "tags", "last_seen"]
                },
                "update": {
                    "query": "UPDATE users SET email = ?, handle = ?, name = ?, bio = ?, tags = ?, last_seen = ? WHERE id = ?",
                    "params": ["email", "handle", "name", "bio", "tags", "last_seen", "id"]
                },
                "select_one": { "query": "SELECT * FROM users WHERE id = ?", "params": ["id"] },
                "select": { "query": "SELECT * FROM users %s", "params": [] },
                "delete": { "query": "DELETE FROM users WHERE id = ?", "params": ["id"] },
                "__unique": {
                    "email": { "query": "SELECT * FROM users WHERE email = ? ALLOW FILTERING", "params": ["email"] },
                    "handle": { "query": "SELECT * FROM users WHERE handle = ? ALLOW FILTERING", "params": ["handle"] }
                }
            }
        })
        .to_string(),
    )
    .unwrap()
}

pub fn post_definition() -> EntityDefinition {
    EntityDefinition::from_json(
        &json!({
            "schema": {
                "kind": "post",
                "fields": {
                    "id": { "type": "identifier" },
                    "created_at": { "type": "timestamp" },
                    "title": { "type": "text", "required": true },
                    "author_id": { "type": "identifier", "references": "user", "queryable": true }
                }
            },
            "statements": {
                "insert": {
                    "query": "INSERT INTO posts (id, created_at, title, author_id) VALUES (?, ?, ?, ?)",
                    "params": ["id", "created_at", "title", "author_id"]
                },
                "update": {
                    "query": "UPDATE posts SET title = ?, author_id = ? WHERE id = ?",
                    "params": ["title", "author_id", "id"]
                },
                "select_one": { "query": "SELECT * FROM posts WHERE id = ?", "params": ["id"] },
                "select": { "query": "SELECT * FROM posts %s", "params": [] },
                "delete": { "query": "DELETE FROM posts WHERE id = ?", "params": ["id"] },
                "__exists": {
                    "author_id": { "query": "SELECT * FROM users WHERE id = ?", "params": ["author_id"] }
                }
            }
        })
        .to_string(),
    )
    .unwrap()
}

pub struct Store {
    pub driver: Arc<MemoryDriver>,
    pub users: EntityDao,
    pub posts: EntityDao,
}

pub fn store() -> Store {
    let driver = Arc::new(MemoryDriver::new());
    let ids = Arc::new(RandomUuidGenerator);
    let users = EntityDao::builder(user_definition(), driver.clone(), ids.clone())
        .build()
        .unwrap();
    let posts = EntityDao::builder(post_definition(), driver.clone(), ids)
        .build()
        .unwrap();
    Store {
        driver,
        users,
        posts,
    }
}
