use serde::{Deserialize, Serialize};

/// The fixed set of categories the shop groups its services into.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServiceCategory {
    #[serde(rename = "Cabelo")]
    Hair,
    #[serde(rename = "Manicure/Pedicure")]
    Nails,
    #[serde(rename = "Massagem")]
    Massage,
    #[serde(rename = "Depilação Corporal")]
    Waxing,
}

impl ServiceCategory {
    pub const ALL: [ServiceCategory; 4] = [
        ServiceCategory::Hair,
        ServiceCategory::Nails,
        ServiceCategory::Massage,
        ServiceCategory::Waxing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceCategory::Hair => "Cabelo",
            ServiceCategory::Nails => "Manicure/Pedicure",
            ServiceCategory::Massage => "Massagem",
            ServiceCategory::Waxing => "Depilação Corporal",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Service {
    pub id: i64,
    pub name: String,
    pub category: ServiceCategory,
    /// Canonical price in cents.
    #[serde(rename = "price")]
    pub price_cents: i64,
    #[serde(rename = "duration")]
    pub duration_minutes: i32,
}
