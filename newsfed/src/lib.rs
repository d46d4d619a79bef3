// Library surface of newsfed
// Integration tests and the binary import everything through here

pub mod aggregator;
pub mod clients;
pub mod error;
pub mod filter;
pub mod models;
pub mod render;
pub mod session;
pub mod shell;

pub use aggregator::{AgencyFailure, Aggregator, QueryOutcome};
pub use error::NewsError;
pub use filter::{FilterValue, QueryFilter};
pub use models::{Agency, Category, Region, Story, StoryDraft};
pub use session::{Credential, Session, SessionManager};
