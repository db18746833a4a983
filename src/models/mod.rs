//! Data models for the library server

pub mod book;
pub mod dashboard;
pub mod feedback;
pub mod master;
pub mod rental;
pub mod user;

// Re-export commonly used types
pub use book::{Book, BookCreate, BookDetails, BookQuery, BookStatus};
pub use dashboard::DashboardStats;
pub use feedback::{CreateFeedback, Feedback};
pub use master::{Author, Genre, Publisher};
pub use rental::{Rental, RentalDetails};
pub use user::{Caller, User};
