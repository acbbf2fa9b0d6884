use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::features::listings::columns::{present_columns, text, url, Column, ColumnValue};
use crate::features::listings::listing::{ListingDraft, ListingPatch, OwnerEdit};
use crate::features::listings::models::ListingStatus;
use crate::shared::types::double_option;

/// Request DTO for submitting a business; new listings start `pending`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateBusinessDto {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    pub license: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 255))]
    pub street_address: Option<String>,
    #[validate(length(max = 255))]
    pub city: Option<String>,
    #[validate(length(max = 64))]
    pub state: Option<String>,
    #[validate(length(max = 32))]
    pub zip: Option<String>,
    pub description: Option<String>,
    pub practice_areas: Option<String>,
    pub language: Option<String>,
    #[validate(length(max = 500))]
    pub website: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    #[validate(length(max = 500))]
    pub works_for: Option<String>,
    pub honors: Option<String>,
    pub work_experience: Option<String>,
    pub associations: Option<String>,
    pub education: Option<String>,
    pub speaking_engagements: Option<String>,
    pub publications: Option<String>,
    pub category_id: Option<i64>,
}

impl ListingDraft for CreateBusinessDto {
    fn display_name(&self) -> &str {
        self.name.trim()
    }

    fn category_id(&self) -> Option<i64> {
        self.category_id
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            ("name", ColumnValue::Text(Some(self.name.trim().to_string()))),
            ("license", text(&self.license)),
            ("email", text(&self.email)),
            ("street_address", text(&self.street_address)),
            ("city", text(&self.city)),
            ("state", text(&self.state)),
            ("zip", text(&self.zip)),
            ("description", text(&self.description)),
            ("practice_areas", text(&self.practice_areas)),
            ("language", text(&self.language)),
            ("website", url(&self.website)),
            ("phone", text(&self.phone)),
            ("image_url", text(&self.image_url)),
            ("works_for", url(&self.works_for)),
            ("honors", text(&self.honors)),
            ("work_experience", text(&self.work_experience)),
            ("associations", text(&self.associations)),
            ("education", text(&self.education)),
            ("speaking_engagements", text(&self.speaking_engagements)),
            ("publications", text(&self.publications)),
            ("category_id", ColumnValue::BigInt(self.category_id)),
        ]
    }
}

/// Request DTO for editing a business (admin); absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateBusinessDto {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: Option<String>,
    pub license: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 255))]
    pub street_address: Option<String>,
    #[validate(length(max = 255))]
    pub city: Option<String>,
    #[validate(length(max = 64))]
    pub state: Option<String>,
    #[validate(length(max = 32))]
    pub zip: Option<String>,
    pub description: Option<String>,
    pub practice_areas: Option<String>,
    pub language: Option<String>,
    #[validate(length(max = 500))]
    pub website: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    #[validate(length(max = 500))]
    pub works_for: Option<String>,
    pub honors: Option<String>,
    pub work_experience: Option<String>,
    pub associations: Option<String>,
    pub education: Option<String>,
    pub speaking_engagements: Option<String>,
    pub publications: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub category_id: Option<Option<i64>>,
    pub is_premium: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub premium_expires: Option<Option<NaiveDate>>,
    pub status: Option<ListingStatus>,
}

impl ListingPatch for UpdateBusinessDto {
    fn category_id(&self) -> Option<Option<i64>> {
        self.category_id
    }

    fn status(&self) -> Option<ListingStatus> {
        self.status
    }

    fn columns(&self) -> Vec<Column> {
        let mut columns = Vec::new();
        if let Some(name) = &self.name {
            columns.push(("name", ColumnValue::Text(Some(name.trim().to_string()))));
        }
        let texts = [
            ("license", &self.license),
            ("email", &self.email),
            ("street_address", &self.street_address),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
            ("description", &self.description),
            ("practice_areas", &self.practice_areas),
            ("language", &self.language),
            ("phone", &self.phone),
            ("image_url", &self.image_url),
            ("honors", &self.honors),
            ("work_experience", &self.work_experience),
            ("associations", &self.associations),
            ("education", &self.education),
            ("speaking_engagements", &self.speaking_engagements),
            ("publications", &self.publications),
        ];
        for (name, value) in texts {
            if value.is_some() {
                columns.push((name, text(value)));
            }
        }
        for (name, value) in [("website", &self.website), ("works_for", &self.works_for)] {
            if value.is_some() {
                columns.push((name, url(value)));
            }
        }
        if let Some(category_id) = self.category_id {
            columns.push(("category_id", ColumnValue::BigInt(category_id)));
        }
        if let Some(is_premium) = self.is_premium {
            columns.push(("is_premium", ColumnValue::Bool(is_premium)));
        }
        if let Some(premium_expires) = self.premium_expires {
            columns.push(("premium_expires", ColumnValue::Date(premium_expires)));
        }
        if let Some(status) = self.status {
            columns.push(("status", ColumnValue::Status(status)));
        }
        columns
    }
}

/// Profile fields a claimant may set; absent or null fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct BusinessOwnerEditDto {
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub website: Option<String>,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    pub license: Option<String>,
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub street_address: Option<String>,
    #[validate(length(max = 255))]
    pub city: Option<String>,
    #[validate(length(max = 64))]
    pub state: Option<String>,
    #[validate(length(max = 32))]
    pub zip: Option<String>,
    pub practice_areas: Option<String>,
    pub honors: Option<String>,
    pub work_experience: Option<String>,
    pub associations: Option<String>,
    pub education: Option<String>,
    pub speaking_engagements: Option<String>,
    pub publications: Option<String>,
    pub language: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 500))]
    pub works_for: Option<String>,
}

impl OwnerEdit for BusinessOwnerEditDto {
    fn columns(&self) -> Vec<Column> {
        present_columns(
            &[
                ("phone", &self.phone),
                ("image_url", &self.image_url),
                ("license", &self.license),
                ("description", &self.description),
                ("street_address", &self.street_address),
                ("city", &self.city),
                ("state", &self.state),
                ("zip", &self.zip),
                ("practice_areas", &self.practice_areas),
                ("honors", &self.honors),
                ("work_experience", &self.work_experience),
                ("associations", &self.associations),
                ("education", &self.education),
                ("speaking_engagements", &self.speaking_engagements),
                ("publications", &self.publications),
                ("language", &self.language),
                ("email", &self.email),
            ],
            &[("website", &self.website), ("works_for", &self.works_for)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::listings::dtos::ClaimRequest;

    #[test]
    fn test_draft_columns_are_fixed() {
        let minimal: CreateBusinessDto =
            serde_json::from_str(r#"{"name": "Acme Law"}"#).unwrap();
        let full: CreateBusinessDto = serde_json::from_str(
            r#"{"name": "Acme Law", "city": "Austin", "website": "acme.example", "category_id": 3}"#,
        )
        .unwrap();

        let names = |dto: &CreateBusinessDto| -> Vec<&'static str> {
            dto.columns().into_iter().map(|(name, _)| name).collect()
        };
        assert_eq!(names(&minimal), names(&full));

        let website = full
            .columns()
            .into_iter()
            .find(|(name, _)| *name == "website")
            .map(|(_, value)| value);
        assert_eq!(
            website,
            Some(ColumnValue::Text(Some("https://acme.example".to_string())))
        );
    }

    #[test]
    fn test_patch_only_present_fields() {
        let patch: UpdateBusinessDto =
            serde_json::from_str(r#"{"city": "Dallas", "category_id": null, "status": "active"}"#)
                .unwrap();

        let columns = patch.columns();
        let names: Vec<&str> = columns.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["city", "category_id", "status"]);
        assert_eq!(patch.category_id(), Some(None));
        assert_eq!(patch.status(), Some(ListingStatus::Active));
    }

    #[test]
    fn test_claim_body_carries_owner_edits() {
        let request: ClaimRequest<BusinessOwnerEditDto> = serde_json::from_str(
            r#"{
                "relationship": "Owner",
                "notes": "Bar number 12345",
                "website": "acme.example",
                "honors": "Super Lawyers 2024",
                "phone": null,
                "name": "Ignored",
                "status": "active"
            }"#,
        )
        .unwrap();

        assert_eq!(request.claim.relationship.as_deref(), Some("Owner"));
        assert_eq!(
            request.claim.verification_notes.as_deref(),
            Some("Bar number 12345")
        );
        assert_eq!(
            request.edits.columns(),
            vec![
                ("honors", ColumnValue::Text(Some("Super Lawyers 2024".to_string()))),
                ("website", ColumnValue::Text(Some("https://acme.example".to_string()))),
            ]
        );
    }

    #[test]
    fn test_owner_edit_email_validated() {
        let edits: BusinessOwnerEditDto =
            serde_json::from_str(r#"{"email": "nope"}"#).unwrap();
        assert!(edits.validate().is_err());
    }

    #[test]
    fn test_invalid_email_rejected() {
        let dto: CreateBusinessDto =
            serde_json::from_str(r#"{"name": "Acme", "email": "not-an-email"}"#).unwrap();
        assert!(dto.validate().is_err());
    }
}
