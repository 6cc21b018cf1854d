pub mod arxiv;
pub mod doi;

pub use arxiv::{is_arxiv_id, ArxivId, ARXIV_DOI_PREFIX};
pub use doi::{doi_prefix, link_to_doi, Doi};
