pub mod checkout;
pub mod contact;
pub mod metrics;
pub mod pricing;
pub mod trial;
pub mod user;

pub use checkout::Checkout;
pub use contact::Contact;
pub use pricing::Catalog;
pub use trial::Trial;
pub use user::User;
