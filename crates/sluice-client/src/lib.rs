pub mod extractor;
pub mod predicate;
pub mod transport;

pub use extractor::FragmentExtractor;
pub use predicate::MarkerPredicate;
pub use transport::ReqwestTransport;
