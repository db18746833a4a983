//! Shared fixtures for unit tests

use chrono::Utc;

use crate::{
    models::{Author, Book, BookStatus, Genre, Publisher, User},
    repository::{memory::SeedData, MemoryStore},
};

pub const ALICE_ID: i32 = 1;
pub const BOB_ID: i32 = 2;
pub const ADMIN_ID: i32 = 3;

pub const LE_GUIN_ID: i32 = 5;
pub const HERBERT_ID: i32 = 7;
pub const VESS_ID: i32 = 9;

pub const FICTION_ID: i32 = 1;
pub const POETRY_ID: i32 = 2;

pub async fn add_user(store: &MemoryStore, id: i32, name: &str) {
    store.insert_user(user(id, name, false)).await;
}

fn user(id: i32, name: &str, is_admin_staff: bool) -> User {
    User {
        id,
        name: name.to_string(),
        email: None,
        code: None,
        department_id: None,
        is_admin_staff,
    }
}

/// Store with three users (the third is staff), three authors, a publisher and two genres
pub async fn seeded_store() -> MemoryStore {
    let named = |id: i32, name: &str| (id, name.to_string());

    MemoryStore::with_seed(SeedData {
        users: vec![
            user(ALICE_ID, "Alice", false),
            user(BOB_ID, "Bob", false),
            user(ADMIN_ID, "Librarian", true),
        ],
        authors: [
            named(LE_GUIN_ID, "Ursula K. Le Guin"),
            named(HERBERT_ID, "Frank Herbert"),
            named(VESS_ID, "Charles Vess"),
        ]
        .into_iter()
        .map(|(id, name)| Author { id, name })
        .collect(),
        publishers: vec![Publisher {
            id: 1,
            name: "Ace Books".to_string(),
        }],
        genres: vec![
            Genre {
                id: FICTION_ID,
                name: "Fiction".to_string(),
            },
            Genre {
                id: POETRY_ID,
                name: "Poetry".to_string(),
            },
        ],
    })
}

/// Load an available book with the given id and no authors
pub async fn add_book(store: &MemoryStore, id: i32, title: &str) -> i32 {
    let now = Utc::now();
    store
        .insert_book(Book {
            id,
            title: title.to_string(),
            publisher_id: None,
            genre_id: Some(FICTION_ID),
            publication_date: None,
            isbn: None,
            cover_image_url: None,
            description: None,
            notes: None,
            is_recommended: false,
            status: BookStatus::Available,
            created_at: now,
            updated_at: now,
        })
        .await;
    id
}
