pub mod ids;
pub mod records;
pub mod sanitize;
pub mod validate;

pub use ids::{InquiryId, RegistrationId};
pub use records::{
    Category, ContactInquiry, EventRegistration, NewsletterSubscriber, Record, RecordError,
    SupportPledge,
};
pub use sanitize::{sanitize, sanitize_value};
pub use validate::{is_truthy, is_valid_email};
