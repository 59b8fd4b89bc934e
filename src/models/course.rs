use serde::{Deserialize, Serialize};

/// A course in the marketplace catalog.
///
/// Catalog management lives in the admin surface; the checkout layer only
/// reads courses, and the reconciler re-reads `price` at settlement time as
/// the authoritative subtotal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub name: String,
    pub slug: String,
    /// Price in rupiah (whole units, no cents).
    pub price: i64,
    pub is_active: bool,
    pub created_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateCourse {
    pub name: String,
    pub slug: String,
    pub price: i64,
}
