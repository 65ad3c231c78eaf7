pub mod contact_submission;
pub mod subscription;
pub mod trial;
pub mod trial_extension;
pub mod user;

pub use subscription::BillingInterval;
pub use trial::{Features, Plan, TrialStatus, UsageCounter, UsageStats};
