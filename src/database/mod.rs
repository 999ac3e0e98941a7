//! Database services.
//!
//! One service per entity family, each a thin struct over `PgPool` issuing
//! runtime queries. Row structs live beside the service that loads them and
//! mirror the columns actually selected. All tables sit in the `nexus`
//! schema; migrations are managed outside this repository.

pub mod agent_service;
pub mod client_service;
pub mod credential_service;
pub mod exception_service;
pub mod node_service;
pub mod plan_service;
pub mod proposal_service;
pub mod survey_service;
pub mod workflow_service;

pub use agent_service::AgentService;
pub use client_service::ClientService;
pub use credential_service::CredentialService;
pub use exception_service::ExceptionService;
pub use node_service::NodeService;
pub use plan_service::PlanService;
pub use proposal_service::ProposalService;
pub use survey_service::SurveyService;
pub use workflow_service::WorkflowService;
