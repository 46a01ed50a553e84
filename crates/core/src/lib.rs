pub mod config;
pub mod credentials;
pub mod domain;
pub mod errors;
pub mod gateway;
pub mod normalization;
pub mod policy;
pub mod ports;
pub mod simulation;
pub mod submission;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_support;

pub use credentials::{CachedToken, CredentialCache};
pub use domain::proposal::{
    BankName, FlowType, IdentityKey, LoanTerms, MaritalStatus, PropertyType, Proposal,
    ProposalSnapshot,
};
pub use domain::submission::{ClientId, ExternalProposalId, ProposalResult, SubmissionFailure};
pub use domain::validation::{
    Adjustment, BestBankOption, MultiValidationResult, ValidationError, ValidationResult,
};
pub use errors::{BankError, DomainError, RepositoryError};
pub use gateway::{BankGateway, BankGateways, GatewaySettings};
pub use normalization::{Normalizer, ProposalNormalizer, SimulationNormalizer};
pub use policy::{BankPolicy, BankPolicyTable};
pub use simulation::SimulationService;
pub use submission::{
    SubmissionError, SubmissionOrchestrator, SubmissionOutcome, SubmissionSettings,
};
pub use validation::{StrategyRegistry, ValidationManager, ValidationStrategy};
