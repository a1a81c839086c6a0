use std::str::FromStr;
use derive_more::Display;
use crate::server::model::order::LocalId;

pub(crate) type ProductId = i32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub(crate) enum ProductStatus {
    #[display("available")]
    Available,
    #[display("sold_out")]
    SoldOut,
    #[display("inactive")]
    Inactive,
}

impl FromStr for ProductStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(Self::Available),
            "sold_out" => Ok(Self::SoldOut),
            "inactive" => Ok(Self::Inactive),
            s => Err(format!("Invalid ProductStatus: {s}")),
        }
    }
}

/// Menu entry as stored, only the columns orders care about
#[derive(Debug, Clone)]
pub(crate) struct Product {
    pub id: ProductId,
    pub local_id: LocalId,
    pub name: String,
    /// minor currency units
    pub price: i64,
    pub status: ProductStatus,
}

impl Product {
    pub fn is_available(&self) -> bool {
        self.status == ProductStatus::Available
    }
}
