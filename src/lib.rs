//! Job-posting detection for browser page snapshots.
//!
//! A [`trigger::Trigger`] decides when to scan, [`detect::scan`] decides
//! whether the page is a job posting, [`extract::extract`] pulls the posting's
//! fields, and [`messaging`] lets the UI side ask for the result.

pub mod corpus;
pub mod detect;
pub mod detector;
pub mod error;
pub mod extract;
pub mod messaging;
pub mod page;
pub mod policy;
pub mod trigger;

pub use detect::PageSignal;
pub use detector::{Detection, Detector};
pub use error::{Error, Result};
pub use extract::ExtractedJobData;
pub use page::{Page, Snapshot};
pub use policy::Policy;
