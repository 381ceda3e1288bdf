//! `credential` implements the issue-credential protocol over a completed connection
//!
//! An exchange starts either with a holder proposal or directly with an issuer offer. The
//! holder answers an offer with a request bound to its link secret, the issuer signs the
//! credential and the holder acknowledges it once it verified against the credential
//! definition published on the ledger.
mod exchange;
mod issued;
mod preview;
mod types;
mod usecase;

pub use exchange::CredentialExchange;
pub use issued::IssuedCredential;
pub use preview::{CredentialPreview, PreviewAttribute};
pub use types::{
    AutoAccept, AutoAcceptPolicy, ContentApproval, CredentialError, ExchangeID, OfferConfig,
    ProposalConfig, RepoBuilder, Role, State, UsecaseBuilder,
};
pub use usecase::{Usecase, PROBLEM_EXCHANGE_ABANDONED, REASON_EXCHANGE_EXPIRED};
