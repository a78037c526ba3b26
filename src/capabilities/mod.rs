//! Injectable capabilities (§1, §6): the metadata extractor (a media probe
//! that yields a JSON-shaped map) and the summarizer (a text generator over
//! that metadata). Both are out of scope as *implementations* — only the
//! seam and a mock are required — but the Worker's attempt loop (§4.4) is
//! written once against the traits here, with `managed` variants selected by
//! `capabilities.extractor_mode` / `capabilities.summarizer_mode`.

pub mod extractor;
pub mod summarizer;

pub use extractor::{ExtractorError, ManagedExtractor, MediaExtractor, MockExtractor};
pub use summarizer::{ManagedSummarizer, Summarizer, SummarizerError, MockSummarizer};
