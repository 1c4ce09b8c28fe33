pub mod admission;
pub mod clock;
pub mod config;
pub mod corpus;
pub mod error;
pub mod index;
pub mod tokenizer;
pub mod tracker;

pub use admission::{client_identity, AdmissionController, Decision, DonorKeys, Rejection, Usage};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::RateLimitConfig;
pub use corpus::{Corpus, Fragment, FragmentId, Metadata};
pub use error::{Error, Result};
pub use index::{Hit, IndexStats, InvertedIndex};
