pub mod attempts;
pub mod db;
pub mod feedback_llm;
pub mod images;
pub mod mail;
pub mod memory;

pub use attempts::{InMemoryAttemptCounter, PgAttemptCounter};
pub use db::DbAdapter;
pub use feedback_llm::OpenAiFeedbackAdapter;
pub use images::{CloudinaryAdapter, UnavailableImageStore};
pub use mail::{HttpMailAdapter, LogOnlyMailer};
pub use memory::InMemoryDb;
