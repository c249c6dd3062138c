//! Swap negotiation engine for exchangeable calendar slots.
//! This crate is the single source of truth for swap invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod views;

pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::proposal::{Decision, Proposal, ProposalId, ProposalState};
pub use model::slot::{Slot, SlotId, SlotState, SlotValidationError};
pub use model::user::{UserId, UserProfile};
pub use repo::proposal_repo::{ProposalRepository, SqliteProposalRepository};
pub use repo::slot_repo::{SlotRepository, SqliteSlotRepository};
pub use repo::user_repo::{SqliteUserRepository, UserRepository};
pub use repo::{RepoError, RepoResult};
pub use service::slot_service::{SlotService, SlotServiceError};
pub use service::swap_error::{SwapError, SwapErrorKind, SwapResult};
pub use service::swap_service::SwapService;
pub use views::marketplace::MarketSlot;
pub use views::proposals::{ProposalDetail, ProposalInbox};
