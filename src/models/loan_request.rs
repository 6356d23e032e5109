//! Loan request API models
//!
//! Request bodies arrive as loosely typed JSON (the frontend sends numbers as
//! strings and booleans as "yes"/"1"), so body fields are `Value`s that go
//! through sanitization first and validation second.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::{loan_requests, vault_lenders, vault_repayments, vaults};
use crate::services::sanitize::{self, limits};
use crate::services::validation;

/// Body of POST /loan-requests
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateLoanRequestBody {
    #[serde(default, alias = "invoiceNumber")]
    pub invoice_number: Value,
    #[serde(default, alias = "invoiceAmount")]
    pub invoice_amount: Value,
    #[serde(default, alias = "invoiceDueDate")]
    pub invoice_due_date: Value,
    #[serde(default, alias = "customerName")]
    pub customer_name: Value,
    #[serde(default)]
    pub term: Value,
    #[serde(default, alias = "advanceRate")]
    pub advance_rate: Value,
    #[serde(default, alias = "monthlyInterestRate")]
    pub monthly_interest_rate: Value,
    #[serde(default, alias = "maxLoan")]
    pub max_loan: Value,
    #[serde(default, alias = "deliveryCompleted")]
    pub delivery_completed: Value,
    #[serde(default, alias = "notPledged")]
    pub not_pledged: Value,
    #[serde(default, alias = "assignmentSigned")]
    pub assignment_signed: Value,
    #[serde(default, alias = "borrowerAddress")]
    pub borrower_address: Value,
}

/// Loan request fields after sanitization, before validation
#[derive(Debug, Clone, PartialEq)]
pub struct LoanRequestInput {
    pub invoice_number: String,
    pub invoice_amount: Decimal,
    pub invoice_due_date: String,
    pub customer_name: String,
    pub term: i64,
    pub advance_rate: Decimal,
    pub monthly_interest_rate: Decimal,
    pub max_loan: Decimal,
    pub delivery_completed: bool,
    pub not_pledged: bool,
    pub assignment_signed: bool,
    pub borrower_address: String,
}

/// A validated loan request ready for insertion
#[derive(Debug, Clone, PartialEq)]
pub struct NewLoanRequest {
    pub invoice_number: String,
    pub invoice_amount: Decimal,
    pub invoice_due_date: NaiveDate,
    pub customer_name: String,
    pub term: i32,
    pub advance_rate: Decimal,
    pub monthly_interest_rate: Decimal,
    pub max_loan: Decimal,
    pub delivery_completed: bool,
    pub not_pledged: bool,
    pub assignment_signed: bool,
    pub borrower_address: String,
}

impl CreateLoanRequestBody {
    pub fn sanitize(&self) -> LoanRequestInput {
        LoanRequestInput {
            invoice_number: sanitize::text_value(&self.invoice_number, limits::INVOICE_NUMBER),
            invoice_amount: sanitize::decimal_value(&self.invoice_amount),
            invoice_due_date: sanitize::date_value(&self.invoice_due_date),
            customer_name: sanitize::text_value(&self.customer_name, limits::CUSTOMER_NAME),
            term: sanitize::integer_value(&self.term),
            advance_rate: sanitize::decimal_value(&self.advance_rate),
            monthly_interest_rate: sanitize::decimal_value(&self.monthly_interest_rate),
            max_loan: sanitize::decimal_value(&self.max_loan),
            delivery_completed: sanitize::bool_value(&self.delivery_completed),
            not_pledged: sanitize::bool_value(&self.not_pledged),
            assignment_signed: sanitize::bool_value(&self.assignment_signed),
            borrower_address: sanitize::address_value(&self.borrower_address),
        }
    }
}

impl LoanRequestInput {
    /// Stops at the first invalid field
    pub fn validate(self) -> Result<NewLoanRequest, String> {
        validation::validate_required("invoice_number", &self.invoice_number)?;
        validation::validate_positive_amount("invoice_amount", self.invoice_amount)?;
        let invoice_due_date = validation::validate_date("invoice_due_date", &self.invoice_due_date)?;
        validation::validate_required("customer_name", &self.customer_name)?;
        let term = validation::validate_positive_integer("term", self.term)?;
        validation::validate_rate("advance_rate", self.advance_rate)?;
        validation::validate_rate("monthly_interest_rate", self.monthly_interest_rate)?;
        validation::validate_positive_amount("max_loan", self.max_loan)?;
        validation::validate_address("borrower_address", &self.borrower_address)?;

        Ok(NewLoanRequest {
            invoice_number: self.invoice_number,
            invoice_amount: self.invoice_amount,
            invoice_due_date,
            customer_name: self.customer_name,
            term,
            advance_rate: self.advance_rate,
            monthly_interest_rate: self.monthly_interest_rate,
            max_loan: self.max_loan,
            delivery_completed: self.delivery_completed,
            not_pledged: self.not_pledged,
            assignment_signed: self.assignment_signed,
            borrower_address: self.borrower_address,
        })
    }
}

/// Body of PATCH /loan-requests/{id}/status
#[derive(Debug, Deserialize)]
pub struct UpdateStatusBody {
    #[serde(default)]
    pub status: Value,
}

/// Query for GET /loan-requests
#[derive(Debug, Deserialize)]
pub struct ListByStatusQuery {
    pub status: Option<String>,
}

/// Query for GET /loan-requests/borrower/{address}
#[derive(Debug, Deserialize)]
pub struct BorrowerLoansQuery {
    /// `include=vaults` joins the associated vault
    pub include: Option<String>,
}

impl BorrowerLoansQuery {
    pub fn include_vaults(&self) -> bool {
        self.include
            .as_deref()
            .map(|v| v.split(',').any(|part| part.trim().eq_ignore_ascii_case("vaults")))
            .unwrap_or(false)
    }
}

/// Loan request joined with its vault (null when not yet approved)
#[derive(Debug, Clone, Serialize)]
pub struct LoanRequestWithVault {
    #[serde(flatten)]
    pub loan_request: loan_requests::Model,
    pub vault: Option<vaults::Model>,
}

/// Either plain rows or rows with the vault joined, depending on `include`
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BorrowerLoans {
    Plain(Vec<loan_requests::Model>),
    WithVaults(Vec<LoanRequestWithVault>),
}

/// Per-borrower status counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoanStats {
    pub active: u64,
    pub paid: u64,
    pub defaulted: u64,
    pub listed: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VaultDetails {
    #[serde(flatten)]
    pub vault: vaults::Model,
    pub lenders: Vec<vault_lenders::Model>,
    pub repayments: Vec<vault_repayments::Model>,
}

/// Loan request with its vaults, their deposits and repayments, and the
/// derived balances
#[derive(Debug, Clone, Serialize)]
pub struct LoanRequestDetails {
    #[serde(flatten)]
    pub loan_request: loan_requests::Model,
    pub vaults: Vec<VaultDetails>,
    pub total_funded: Decimal,
    pub total_repaid: Decimal,
    pub accrued_debt: Decimal,
    pub outstanding_balance: Decimal,
}
