//! Catalog management service

use crate::{
    error::{AppError, AppResult},
    models::book::{BookCreate, BookDetails, BookQuery, BookStatus},
    repository::{Repository, Transaction},
};

#[derive(Clone)]
pub struct CatalogService {
    repository: Repository,
}

/// Author ids with repeats removed, first occurrence wins
fn dedup_author_ids(ids: &[i32]) -> Vec<i32> {
    let mut seen = Vec::with_capacity(ids.len());
    for &id in ids {
        if !seen.contains(&id) {
            seen.push(id);
        }
    }
    seen
}

/// Strip separators from an ISBN, dropping it entirely when nothing is left
fn normalize_isbn(isbn: Option<String>) -> Option<String> {
    isbn.map(|raw| {
        raw.chars()
            .filter(|c| !c.is_whitespace() && *c != '-')
            .collect::<String>()
    })
    .filter(|s| !s.is_empty())
}

fn normalize(mut book: BookCreate) -> AppResult<BookCreate> {
    book.title = book.title.trim().to_string();
    if book.title.is_empty() {
        return Err(AppError::Validation("Title is required".to_string()));
    }
    book.isbn = normalize_isbn(book.isbn);
    book.author_ids = dedup_author_ids(&book.author_ids);
    Ok(book)
}

async fn insert_authors(tx: &mut dyn Transaction, book_id: i32, author_ids: &[i32]) -> AppResult<()> {
    for (idx, &author_id) in author_ids.iter().enumerate() {
        let position = i16::try_from(idx + 1)
            .map_err(|_| AppError::Validation("Too many authors".to_string()))?;
        tx.insert_book_author(book_id, author_id, position).await?;
    }
    Ok(())
}

impl CatalogService {
    pub fn new(repository: Repository) -> Self {
        Self { repository }
    }

    /// Search books by keyword and/or genre
    pub async fn search_books(&self, query: &BookQuery) -> AppResult<Vec<BookDetails>> {
        self.repository.books.search(query.keyword(), query.genre_id).await
    }

    /// Get a book with publisher, genre and author names
    pub async fn get_book(&self, id: i32) -> AppResult<BookDetails> {
        self.repository
            .books
            .get_details(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Book with id {} not found", id)))
    }

    pub async fn get_recommended_books(&self) -> AppResult<Vec<BookDetails>> {
        self.repository.books.get_recommended().await
    }

    /// Create a book together with its author associations.
    ///
    /// New books always start `Available`.
    pub async fn create_book(&self, book: BookCreate) -> AppResult<BookDetails> {
        let book = normalize(book)?;

        let mut tx = self.repository.storage.begin().await?;
        let id = tx.insert_book(&book, BookStatus::Available).await?;
        insert_authors(tx.as_mut(), id, &book.author_ids).await?;
        tx.commit().await?;

        tracing::info!(book_id = id, title = %book.title, authors = book.author_ids.len(), "Book created");
        self.reload(id).await
    }

    /// Overwrite a book's fields and replace its whole author set.
    ///
    /// Status is left alone.
    pub async fn update_book(&self, id: i32, book: BookCreate) -> AppResult<BookDetails> {
        let book = normalize(book)?;

        let mut tx = self.repository.storage.begin().await?;
        if tx.lock_book(id).await?.is_none() || !tx.update_book(id, &book).await? {
            return Err(AppError::NotFound(format!("Book with id {} not found", id)));
        }

        let removed = tx.delete_book_authors(id).await?;
        insert_authors(tx.as_mut(), id, &book.author_ids).await?;
        tx.commit().await?;

        tracing::info!(
            book_id = id,
            removed_authors = removed,
            authors = book.author_ids.len(),
            "Book updated"
        );
        self.reload(id).await
    }

    async fn reload(&self, id: i32) -> AppResult<BookDetails> {
        self.repository
            .books
            .get_details(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Book {} missing after write", id)))
    }
}
