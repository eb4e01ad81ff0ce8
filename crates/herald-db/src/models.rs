/// Database row types for data that must never leave the DB layer as-is.
/// Everything else maps straight onto herald-types models.
use chrono::{DateTime, Utc};
use herald_types::models::User;
use uuid::Uuid;

pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    /// Argon2 PHC string.
    pub password: String,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    pub fn to_user(&self) -> User {
        User {
            id: self.id,
            email: self.email.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}
