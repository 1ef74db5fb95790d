pub use super::job_status::Entity as JobStatus;
