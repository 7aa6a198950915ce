//! facecheck-id — identity details from ID card text.
//!
//! The OCR engine itself is pluggable through [`TextRecognizer`]; this crate
//! turns its output into a date of birth and an adulthood check.

pub mod identity;

pub use identity::{
    age_on, extract_identity_text, find_dob, parse_identity_text, IdentityInfo, OcrError,
    TextRecognizer,
};
