pub mod enrichment;
pub mod error;
pub mod extract;
pub mod generator;
pub mod portfolio;
pub mod prompt;
pub mod sentiment;
pub mod service;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use enrichment::{build_article, enrich_citations, HttpLinkPreviewer, LinkPreview, LinkPreviewer};
pub use error::{Result, SummaryError};
pub use extract::{extract_json, parse_summary, sanitize_json_strings};
pub use generator::SummaryGenerator;
pub use portfolio::{format_positions, HttpPositionsClient, Position, PositionsClient, Quantity, NO_POSITIONS};
pub use prompt::{build_messages, Personalization};
pub use sentiment::score as sentiment_score;
pub use service::{SummaryRead, SummaryService, SUMMARY_MAX_AGE};
pub use traits::{AccountDirectory, ChatCompletionClient, PersonalizationSource, SummaryRepository};
