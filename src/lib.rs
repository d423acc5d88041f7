pub mod bindings;
pub mod commit;
pub mod driver;
pub mod error;
pub mod history;
pub mod identity;
pub mod materialize;
pub mod range;
pub mod source;

pub use driver::{Driver, ReplayOptions, ReplaySummary};
pub use error::{MigrateError, Result};
pub use history::ChangesetRecord;
pub use identity::IdentityMap;
pub use range::Range;
pub use source::{Source, TfClient};
