//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod ai_model_configuration;
pub mod api_key;
pub mod audit_log;
pub mod communication_log;
pub mod communication_template;
pub mod company;
pub mod compliance_report;
pub mod data_retention_policy;
pub mod expense;
pub mod field_report;
pub mod gdpr_request;
pub mod geofence;
pub mod invoice;
pub mod job_cost;
pub mod journal_entry;
pub mod journal_line;
pub mod notification_rule;
pub mod project;
pub mod quality_inspection;
pub mod risk_alert;
pub mod risk_prediction;
pub mod social_post;
pub mod social_post_queue;
pub mod types;
pub mod webhook;

// Re-export specific types to avoid conflicts
pub use ai_model_configuration::Entity as AiModelConfiguration;
pub use api_key::Entity as ApiKey;
pub use audit_log::Entity as AuditLog;
pub use communication_log::Entity as CommunicationLog;
pub use communication_template::Entity as CommunicationTemplate;
pub use company::Entity as Company;
pub use compliance_report::Entity as ComplianceReport;
pub use data_retention_policy::Entity as DataRetentionPolicy;
pub use expense::Entity as Expense;
pub use field_report::Entity as FieldReport;
pub use gdpr_request::Entity as GdprRequest;
pub use geofence::Entity as Geofence;
pub use invoice::Entity as Invoice;
pub use job_cost::Entity as JobCost;
pub use journal_entry::Entity as JournalEntry;
pub use journal_line::Entity as JournalLine;
pub use notification_rule::Entity as NotificationRule;
pub use project::Entity as Project;
pub use quality_inspection::Entity as QualityInspection;
pub use risk_alert::Entity as RiskAlert;
pub use risk_prediction::Entity as RiskPrediction;
pub use social_post::Entity as SocialPost;
pub use social_post_queue::Entity as SocialPostQueue;
pub use types::StringList;
pub use webhook::Entity as Webhook;
