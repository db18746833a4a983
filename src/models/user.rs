//! User model and caller identity

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use crate::error::AppError;

/// Library user (borrower or staff)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct User {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub code: Option<String>,
    pub department_id: Option<i32>,
    pub is_admin_staff: bool,
}

/// Identity of whoever is calling, as supplied by the request layer.
///
/// Authentication happens upstream; the server trusts the privilege flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<i32>,
    pub is_admin_staff: bool,
}

impl Caller {
    pub fn staff(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            is_admin_staff: true,
        }
    }

    pub fn member(user_id: i32) -> Self {
        Self {
            user_id: Some(user_id),
            is_admin_staff: false,
        }
    }

    /// Require administrative staff privileges
    pub fn require_admin_staff(&self) -> Result<(), AppError> {
        if self.is_admin_staff {
            Ok(())
        } else {
            Err(AppError::Authorization(
                "Administrative staff privileges required".to_string(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_admin_staff() {
        assert!(Caller::staff(1).require_admin_staff().is_ok());
        assert!(matches!(
            Caller::member(2).require_admin_staff(),
            Err(AppError::Authorization(_))
        ));
        assert!(Caller::default().require_admin_staff().is_err());
    }
}
