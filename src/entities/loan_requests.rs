//! SeaORM Entity for loan_requests
//!
//! Amounts and rates are stored as canonical decimal strings and parsed into
//! `Decimal` by the services.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Loan request lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "UPPERCASE")]
pub enum LoanStatus {
    #[sea_orm(string_value = "REQUESTED")]
    Requested,
    #[sea_orm(string_value = "REJECTED")]
    Rejected,
    #[sea_orm(string_value = "LISTED")]
    Listed,
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "PAID")]
    Paid,
    #[sea_orm(string_value = "CANCELED")]
    Canceled,
    #[sea_orm(string_value = "DEFAULTED")]
    Defaulted,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Requested => "REQUESTED",
            LoanStatus::Rejected => "REJECTED",
            LoanStatus::Listed => "LISTED",
            LoanStatus::Active => "ACTIVE",
            LoanStatus::Paid => "PAID",
            LoanStatus::Canceled => "CANCELED",
            LoanStatus::Defaulted => "DEFAULTED",
        }
    }

    /// No transition leaves these states
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LoanStatus::Paid | LoanStatus::Rejected | LoanStatus::Canceled | LoanStatus::Defaulted
        )
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "REQUESTED" => Ok(LoanStatus::Requested),
            "REJECTED" => Ok(LoanStatus::Rejected),
            "LISTED" => Ok(LoanStatus::Listed),
            "ACTIVE" => Ok(LoanStatus::Active),
            "PAID" => Ok(LoanStatus::Paid),
            "CANCELED" => Ok(LoanStatus::Canceled),
            "DEFAULTED" => Ok(LoanStatus::Defaulted),
            _ => Err(format!(
                "Invalid status '{}'. Must be one of: REQUESTED, REJECTED, LISTED, ACTIVE, PAID, CANCELED, DEFAULTED",
                s
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "loan_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub invoice_number: String,
    /// Invoice face value (decimal string)
    pub invoice_amount: String,
    pub invoice_due_date: Date,
    pub customer_name: String,
    /// Financing term in days
    pub term: i32,
    /// Fraction of face value offered, in [0, 1]
    pub advance_rate: String,
    /// Monthly interest as a fraction, in [0, 1]
    pub monthly_interest_rate: String,
    /// invoice_amount x advance_rate, as submitted by the client
    pub max_loan: String,
    pub delivery_completed: bool,
    pub not_pledged: bool,
    pub assignment_signed: bool,
    /// Lowercase 0x-prefixed wallet address (42 chars)
    pub borrower_address: String,
    pub status: LoanStatus,
    pub created_at: DateTimeWithTimeZone,
    pub modified_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::vaults::Entity")]
    Vaults,
}

impl Related<super::vaults::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vaults.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
