use facecheck_core::{QualityPair, Verification, VerifyError};
use facecheck_id::IdentityInfo;
use serde::Serialize;

/// Combined verification + identity body, in the web API's field names.
#[derive(Debug, Serialize)]
pub struct VerifyResponse {
    pub dob: String,
    pub age: u32,
    #[serde(rename = "is18Plus")]
    pub is_18_plus: bool,
    #[serde(rename = "isMatch")]
    pub is_match: bool,
    #[serde(rename = "matchScore")]
    pub match_score: f32,
    pub quality: QualityPair,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Response {
    Verified(VerifyResponse),
    Failed { error: String },
}

impl Response {
    pub fn assemble(identity: &IdentityInfo, verification: &Result<Verification, VerifyError>) -> Self {
        match verification {
            Ok(v) => Response::Verified(VerifyResponse {
                dob: identity.dob_display(),
                age: identity.age,
                is_18_plus: identity.is_18_or_more,
                is_match: v.is_match,
                match_score: v.confidence,
                quality: v.quality,
            }),
            Err(e) => Response::Failed {
                error: e.to_string(),
            },
        }
    }
}
