//! Rule-based recovery of fields that NF-e documents only carry as free text.

pub mod amounts;
pub mod issuer;
pub mod normalize;
pub mod patterns;
pub mod process;

pub use amounts::{parse_grouped_amount, parse_plain_amount, KeywordAmountExtractor};
pub use issuer::IssuerIdentifier;
pub use normalize::{normalize, process_key};
pub use process::{ProcessExtractor, ProcessMatch, ProcessRule};

/// Trait for free-text field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract the field from text.
    fn extract(&self, text: &str) -> Option<Self::Output>;
}
