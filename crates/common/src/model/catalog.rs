use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::impl_record;
use crate::{CustomerId, ProductId, Version};

/// A brand owner identified by its Global Location Number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub company_name: String,
    /// 13-digit GLN. Its leading digits are the GS1 company prefix used when
    /// minting SSCCs for this customer's containers.
    pub gln: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub version: Version,
}

impl Customer {
    pub fn new(company_name: impl Into<String>, gln: impl Into<String>) -> Self {
        Self {
            id: CustomerId::new(),
            company_name: company_name.into(),
            gln: gln.into(),
            description: None,
            is_active: true,
            created_at: Utc::now(),
            version: Version::first(),
        }
    }
}

impl_record!(Customer, "Customer");

/// A trade item identified by its GTIN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    /// GTIN-8, -12, -13 or -14 as registered; padded to 14 digits only when
    /// encoded into a Data Matrix payload.
    pub gtin: String,
    pub product_name: String,
    pub description: Option<String>,
    pub customer_id: CustomerId,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub version: Version,
}

impl Product {
    pub fn new(
        customer_id: CustomerId,
        gtin: impl Into<String>,
        product_name: impl Into<String>,
    ) -> Self {
        Self {
            id: ProductId::new(),
            gtin: gtin.into(),
            product_name: product_name.into(),
            description: None,
            customer_id,
            is_active: true,
            created_at: Utc::now(),
            version: Version::first(),
        }
    }
}

impl_record!(Product, "Product");
