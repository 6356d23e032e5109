pub use super::borrower_kyb::Entity as BorrowerKyb;
pub use super::loan_requests::Entity as LoanRequests;
pub use super::vault_deployments::Entity as VaultDeployments;
pub use super::vault_lenders::Entity as VaultLenders;
pub use super::vault_repayments::Entity as VaultRepayments;
pub use super::vaults::Entity as Vaults;
