//! Date of birth, age and adulthood from ID card text.

use chrono::{Datelike, NaiveDate};
use image::RgbImage;
use regex::Regex;
use serde::{Serialize, Serializer};
use std::sync::OnceLock;
use thiserror::Error;

/// Date format printed on the card.
const DOB_FORMAT: &str = "%d/%m/%Y";
/// ASCII digits only: `\d` would also match Devanagari and other numerals.
const DOB_PATTERN_SRC: &str = r"[0-9]{2}/[0-9]{2}/[0-9]{4}";
const ADULT_AGE: u32 = 18;

static DOB_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("text recognition failed: {0}")]
    Recognition(String),
}

/// OCR backend: returns the text fragments found in an image, in reading order.
pub trait TextRecognizer: Send + Sync {
    fn recognize(&self, image: &RgbImage) -> Result<Vec<String>, OcrError>;
}

/// What the ID card says about its holder's age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityInfo {
    /// `DD/MM/YYYY`, or `"N/A"` when no valid date was found.
    #[serde(serialize_with = "serialize_dob")]
    pub dob: Option<NaiveDate>,
    /// Whole years as of the reference date; 0 when unknown.
    pub age: u32,
    pub is_18_or_more: bool,
}

impl IdentityInfo {
    /// The "nothing usable found" result.
    pub fn not_found() -> Self {
        Self {
            dob: None,
            age: 0,
            is_18_or_more: false,
        }
    }

    pub fn from_dob(dob: NaiveDate, today: NaiveDate) -> Self {
        let age = age_on(dob, today);
        Self {
            dob: Some(dob),
            age,
            is_18_or_more: age >= ADULT_AGE,
        }
    }

    /// Date of birth as printed on the card, or `"N/A"`.
    pub fn dob_display(&self) -> String {
        match self.dob {
            Some(d) => d.format(DOB_FORMAT).to_string(),
            None => "N/A".to_string(),
        }
    }
}

fn serialize_dob<S: Serializer>(dob: &Option<NaiveDate>, s: S) -> Result<S::Ok, S::Error> {
    match dob {
        Some(d) => s.collect_str(&d.format(DOB_FORMAT)),
        None => s.serialize_str("N/A"),
    }
}

/// Completed years between `dob` and `today`. Dates in the future give 0.
pub fn age_on(dob: NaiveDate, today: NaiveDate) -> u32 {
    let birthday_pending = (today.month(), today.day()) < (dob.month(), dob.day());
    let years = today.year() - dob.year() - i32::from(birthday_pending);
    u32::try_from(years).unwrap_or(0)
}

/// Find the first `DD/MM/YYYY` token in `text` that is a real calendar date.
///
/// Unlike a plain first-match search, impossible dates such as `31/02/2020`
/// are skipped and the scan continues with the next token.
pub fn find_dob(text: &str) -> Option<NaiveDate> {
    dob_pattern()?
        .find_iter(text)
        .find_map(|m| NaiveDate::parse_from_str(m.as_str(), DOB_FORMAT).ok())
}

fn dob_pattern() -> Option<&'static Regex> {
    DOB_PATTERN
        .get_or_init(|| match Regex::new(DOB_PATTERN_SRC) {
            Ok(re) => Some(re),
            Err(e) => {
                tracing::error!(error = %e, "bad date of birth pattern");
                None
            }
        })
        .as_ref()
}

/// Parse recognized text fragments into an [`IdentityInfo`] as of `today`.
pub fn parse_identity_text<S: AsRef<str>>(fragments: &[S], today: NaiveDate) -> IdentityInfo {
    let text = fragments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ");

    match find_dob(&text) {
        Some(dob) => IdentityInfo::from_dob(dob, today),
        None => {
            tracing::debug!(chars = text.len(), "no date of birth in recognized text");
            IdentityInfo::not_found()
        }
    }
}

/// Run OCR over an ID card image and extract the holder's age.
///
/// Recognition failures are logged and reported as [`IdentityInfo::not_found`];
/// this path never fails the request.
pub fn extract_identity_text(
    recognizer: &dyn TextRecognizer,
    image: &RgbImage,
    today: NaiveDate,
) -> IdentityInfo {
    match recognizer.recognize(image) {
        Ok(fragments) => {
            tracing::debug!(fragments = fragments.len(), "recognized ID card text");
            parse_identity_text(&fragments, today)
        }
        Err(e) => {
            tracing::warn!(error = %e, "OCR failed; date of birth unavailable");
            IdentityInfo::not_found()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    struct FixedText(Vec<String>);

    impl TextRecognizer for FixedText {
        fn recognize(&self, _image: &RgbImage) -> Result<Vec<String>, OcrError> {
            Ok(self.0.clone())
        }
    }

    struct Failing;

    impl TextRecognizer for Failing {
        fn recognize(&self, _image: &RgbImage) -> Result<Vec<String>, OcrError> {
            Err(OcrError::Recognition("engine unavailable".into()))
        }
    }

    #[test]
    fn test_finds_dob_among_fragments() {
        let fragments = ["Government of India", "Ramesh Kumar", "DOB: 15/08/1990", "Male"];
        let info = parse_identity_text(&fragments, date(2026, 10, 17));
        assert_eq!(info.dob, Some(date(1990, 8, 15)));
        assert_eq!(info.age, 36);
        assert!(info.is_18_or_more);
        assert_eq!(info.dob_display(), "15/08/1990");
    }

    #[test]
    fn test_birthday_not_yet_reached() {
        assert_eq!(age_on(date(2008, 10, 18), date(2026, 10, 17)), 17);
        assert_eq!(age_on(date(2008, 10, 17), date(2026, 10, 17)), 18);
        assert_eq!(age_on(date(2008, 11, 1), date(2026, 10, 17)), 17);
    }

    #[test]
    fn test_adult_boundary() {
        let today = date(2026, 10, 17);
        assert!(IdentityInfo::from_dob(date(2008, 10, 17), today).is_18_or_more);
        assert!(!IdentityInfo::from_dob(date(2008, 10, 18), today).is_18_or_more);
    }

    #[test]
    fn test_future_dob_is_age_zero() {
        assert_eq!(age_on(date(2030, 1, 1), date(2026, 10, 17)), 0);
    }

    #[test]
    fn test_skips_invalid_calendar_dates() {
        let info = parse_identity_text(&["Issued 31/02/2020 DOB 01/01/2000"], date(2026, 10, 17));
        assert_eq!(info.dob, Some(date(2000, 1, 1)));
    }

    #[test]
    fn test_no_date_is_not_found() {
        let info = parse_identity_text(&["Year of Birth 1990", "12/2020"], date(2026, 10, 17));
        assert_eq!(info, IdentityInfo::not_found());
        assert_eq!(info.dob_display(), "N/A");
    }

    #[test]
    fn test_non_ascii_text_around_date() {
        let info = parse_identity_text(&["जन्म तिथि/DOB: 05/03/1985"], date(2026, 10, 17));
        assert_eq!(info.dob, Some(date(1985, 3, 5)));
    }

    #[test]
    fn test_find_dob_ignores_non_ascii_digits() {
        // Devanagari numerals in the same shape are not a date.
        assert_eq!(find_dob("१५/०८/१९९० DOB 15/08/1990"), Some(date(1990, 8, 15)));
        assert_eq!(find_dob("१५/०८/१९९०"), None);
    }

    #[test]
    fn test_find_dob_short_text() {
        assert_eq!(find_dob("1/1/2000"), None);
        assert_eq!(find_dob(""), None);
    }

    #[test]
    fn test_empty_text() {
        let empty: [&str; 0] = [];
        assert_eq!(parse_identity_text(&empty, date(2026, 1, 1)), IdentityInfo::not_found());
    }

    #[test]
    fn test_serialized_shape() {
        let info = IdentityInfo::from_dob(date(1990, 8, 15), date(2026, 10, 17));
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["dob"], "15/08/1990");
        assert_eq!(json["age"], 36);
        assert_eq!(json["is_18_or_more"], true);

        let json = serde_json::to_value(IdentityInfo::not_found()).unwrap();
        assert_eq!(json["dob"], "N/A");
        assert_eq!(json["age"], 0);
    }

    #[test]
    fn test_extract_uses_recognizer() {
        let ocr = FixedText(vec!["DOB 15/08/1990".into()]);
        let info = extract_identity_text(&ocr, &RgbImage::new(4, 4), date(2026, 10, 17));
        assert_eq!(info.age, 36);
    }

    #[test]
    fn test_extract_ocr_failure_is_not_found() {
        let info = extract_identity_text(&Failing, &RgbImage::new(4, 4), date(2026, 10, 17));
        assert_eq!(info, IdentityInfo::not_found());
    }
}
