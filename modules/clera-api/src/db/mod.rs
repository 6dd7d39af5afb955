mod news;
mod profiles;
mod summaries;

pub use news::PgNewsStore;
pub use profiles::{PgAccountDirectory, PgPersonalization};
pub use summaries::PgSummaryStore;
