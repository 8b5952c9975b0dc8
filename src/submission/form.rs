//! Multipart submission form
//!
//! Maps captured artifacts and applicant fields onto the exact multipart
//! field names the verification backend expects. Sending the request is up
//! to the caller.

use crate::capture::{Artifact, CaptureArtifacts};
use serde::{Deserialize, Serialize};

pub const FIELD_NATIONAL_CARD: &str = "nationalCard";
pub const FIELD_NATIONAL_CARD_BACK: &str = "nationalCardBack";
pub const FIELD_SELF_VIDEO: &str = "selfVideo";
pub const FIELD_SELF_PHOTO: &str = "selfPhoto";
pub const FIELD_NATIONAL_CODE: &str = "nationalCode";
pub const FIELD_BIRTH_DATE: &str = "birthDate";
pub const FIELD_MOBILE: &str = "mobile";

/// Text fields collected by the wizard, passed through unchanged
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicantFields {
    pub national_code: String,
    pub birth_date: String,
    pub mobile: String,
}

#[derive(Debug, Clone, Copy)]
pub enum PartValue<'a> {
    File(&'a Artifact),
    Text(&'a str),
}

/// One named multipart field
#[derive(Debug, Clone, Copy)]
pub struct FormPart<'a> {
    pub name: &'static str,
    pub value: PartValue<'a>,
}

impl<'a> FormPart<'a> {
    pub fn file(name: &'static str, artifact: &'a Artifact) -> Self {
        Self {
            name,
            value: PartValue::File(artifact),
        }
    }

    pub fn text(name: &'static str, value: &'a str) -> Self {
        Self {
            name,
            value: PartValue::Text(value),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubmissionForm {
    pub artifacts: CaptureArtifacts,
    pub fields: ApplicantFields,
}

impl SubmissionForm {
    pub fn new(artifacts: CaptureArtifacts, fields: ApplicantFields) -> Self {
        Self { artifacts, fields }
    }

    /// Files first, then text fields
    pub fn parts(&self) -> Vec<FormPart<'_>> {
        let a = &self.artifacts;
        let f = &self.fields;
        vec![
            FormPart::file(FIELD_NATIONAL_CARD, &a.front_id_photo),
            FormPart::file(FIELD_NATIONAL_CARD_BACK, &a.back_id_photo),
            FormPart::file(FIELD_SELF_VIDEO, &a.video),
            FormPart::file(FIELD_SELF_PHOTO, &a.self_photo),
            FormPart::text(FIELD_NATIONAL_CODE, &f.national_code),
            FormPart::text(FIELD_BIRTH_DATE, &f.birth_date),
            FormPart::text(FIELD_MOBILE, &f.mobile),
        ]
    }

    /// Fresh random boundary
    pub fn generate_boundary() -> String {
        format!("----liveness-{}", uuid::Uuid::new_v4().simple())
    }

    /// `Content-Type` header value for a body encoded with `boundary`
    pub fn content_type(boundary: &str) -> String {
        format!("multipart/form-data; boundary={boundary}")
    }

    /// Encode the whole form as a `multipart/form-data` body
    pub fn encode(&self, boundary: &str) -> Vec<u8> {
        let mut body = Vec::new();
        for part in self.parts() {
            body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
            match part.value {
                PartValue::File(artifact) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                            part.name,
                            artifact.file_name(),
                            artifact.mime_type
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(artifact.data());
                }
                PartValue::Text(value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", part.name).as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
        body
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::capture::ArtifactKind;

    pub(crate) fn sample_form() -> SubmissionForm {
        SubmissionForm::new(
            CaptureArtifacts {
                front_id_photo: Artifact::new(ArtifactKind::FrontIdPhoto, "image/png", b"FRONT".to_vec()),
                back_id_photo: Artifact::new(ArtifactKind::BackIdPhoto, "image/png", b"BACK".to_vec()),
                self_photo: Artifact::new(ArtifactKind::SelfPhoto, "image/png", b"SELF".to_vec()),
                video: Artifact::new(ArtifactKind::SelfVideo, "video/webm;codecs=vp9", b"VIDEO".to_vec()),
            },
            ApplicantFields {
                national_code: "0012345678".to_string(),
                birth_date: "1370/01/01".to_string(),
                mobile: "09120000000".to_string(),
            },
        )
    }

    #[test]
    fn test_part_order_and_names() {
        let form = sample_form();
        let names: Vec<_> = form.parts().iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            [
                "nationalCard",
                "nationalCardBack",
                "selfVideo",
                "selfPhoto",
                "nationalCode",
                "birthDate",
                "mobile"
            ]
        );
    }

    #[test]
    fn test_encoded_body() {
        let form = sample_form();
        let body = String::from_utf8(form.encode("XYZ")).unwrap();

        assert!(body.starts_with("--XYZ\r\nContent-Disposition: form-data; name=\"nationalCard\"; filename=\"front_photo.png\"\r\nContent-Type: image/png\r\n\r\nFRONT\r\n"));
        assert!(body.contains(
            "name=\"selfVideo\"; filename=\"self_video.webm\"\r\nContent-Type: video/webm;codecs=vp9\r\n\r\nVIDEO\r\n"
        ));
        assert!(body.contains("name=\"selfPhoto\"; filename=\"self_photo.png\""));
        assert!(body.contains("Content-Disposition: form-data; name=\"mobile\"\r\n\r\n09120000000\r\n"));
        assert!(body.ends_with("--XYZ--\r\n"));
        assert_eq!(body.matches("--XYZ\r\n").count(), 7);

        let card = body.find("name=\"nationalCard\"").unwrap();
        let back = body.find("name=\"nationalCardBack\"").unwrap();
        let code = body.find("name=\"nationalCode\"").unwrap();
        assert!(card < back && back < code);
    }

    #[test]
    fn test_content_type_and_boundary() {
        assert_eq!(
            SubmissionForm::content_type("abc"),
            "multipart/form-data; boundary=abc"
        );
        let a = SubmissionForm::generate_boundary();
        let b = SubmissionForm::generate_boundary();
        assert_ne!(a, b);
        assert!(a.starts_with("----liveness-"));
    }
}
