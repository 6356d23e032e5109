//! Borrower KYB API models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::services::sanitize::{self, limits};
use crate::services::validation;

/// Body of POST /borrower-kyb
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateKybBody {
    #[serde(default, alias = "walletAddress")]
    pub wallet_address: Value,
    #[serde(default, alias = "legalName")]
    pub legal_name: Value,
    #[serde(default)]
    pub country: Value,
    #[serde(default, alias = "registrationNumber")]
    pub registration_number: Value,
    #[serde(default)]
    pub description: Value,
    #[serde(default, alias = "uboName")]
    pub ubo_name: Value,
    #[serde(default, alias = "averageInvoiceAmount")]
    pub average_invoice_amount: Value,
}

/// A validated KYB submission
#[derive(Debug, Clone, PartialEq)]
pub struct NewKyb {
    pub wallet_address: String,
    pub legal_name: String,
    pub country: String,
    pub registration_number: String,
    pub description: String,
    pub ubo_name: String,
    pub average_invoice_amount: Decimal,
}

impl CreateKybBody {
    pub fn into_new_kyb(self) -> Result<NewKyb, String> {
        let kyb = NewKyb {
            wallet_address: sanitize::address_value(&self.wallet_address),
            legal_name: sanitize::text_value(&self.legal_name, limits::LEGAL_NAME),
            country: sanitize::text_value(&self.country, limits::COUNTRY),
            registration_number: sanitize::text_value(&self.registration_number, limits::REGISTRATION_NUMBER),
            description: sanitize::text_value(&self.description, limits::DESCRIPTION),
            ubo_name: sanitize::text_value(&self.ubo_name, limits::UBO_NAME),
            average_invoice_amount: sanitize::decimal_value(&self.average_invoice_amount),
        };

        validation::validate_address("wallet_address", &kyb.wallet_address)?;
        validation::validate_required("legal_name", &kyb.legal_name)?;
        validation::validate_required("country", &kyb.country)?;
        validation::validate_required("registration_number", &kyb.registration_number)?;
        validation::validate_required("description", &kyb.description)?;
        validation::validate_required("ubo_name", &kyb.ubo_name)?;
        validation::validate_positive_amount("average_invoice_amount", kyb.average_invoice_amount)?;

        Ok(kyb)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct KybCheck {
    pub wallet_address: String,
    pub has_kyb: bool,
}
