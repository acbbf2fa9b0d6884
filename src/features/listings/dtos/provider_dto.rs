use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use crate::features::listings::columns::{present_columns, text, url, Column, ColumnValue};
use crate::features::listings::listing::{ListingDraft, ListingPatch, OwnerEdit};
use crate::features::listings::models::ListingStatus;
use crate::shared::types::double_option;

/// Request DTO for submitting a provider; new listings start `pending`
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateProviderDto {
    #[validate(length(min = 1, max = 255, message = "Provider name must be 1-255 characters"))]
    pub provider_name: String,
    #[validate(length(max = 255))]
    pub specialty: Option<String>,
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
    pub insurances: Option<String>,
    pub practice_names: Option<String>,
    pub languages: Option<String>,
    #[validate(regex(
        path = *crate::shared::validation::NPI_REGEX,
        message = "NPI number must be 10 digits"
    ))]
    pub npi_number: Option<String>,
    #[validate(length(max = 500))]
    pub website: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    #[validate(length(max = 500))]
    pub works_for: Option<String>,
    pub popular_visit_reasons: Option<String>,
    pub educations: Option<String>,
    #[validate(length(max = 32))]
    pub gender: Option<String>,
    pub category_id: Option<i64>,
}

impl ListingDraft for CreateProviderDto {
    fn display_name(&self) -> &str {
        self.provider_name.trim()
    }

    fn category_id(&self) -> Option<i64> {
        self.category_id
    }

    fn columns(&self) -> Vec<Column> {
        vec![
            (
                "provider_name",
                ColumnValue::Text(Some(self.provider_name.trim().to_string())),
            ),
            ("specialty", text(&self.specialty)),
            ("email", text(&self.email)),
            ("street_address", text(&self.street_address)),
            ("city", text(&self.city)),
            ("state", text(&self.state)),
            ("zip", text(&self.zip)),
            ("description", text(&self.description)),
            ("insurances", text(&self.insurances)),
            ("practice_names", text(&self.practice_names)),
            ("languages", text(&self.languages)),
            ("npi_number", text(&self.npi_number)),
            ("website", url(&self.website)),
            ("phone", text(&self.phone)),
            ("image_url", text(&self.image_url)),
            ("works_for", url(&self.works_for)),
            ("popular_visit_reasons", text(&self.popular_visit_reasons)),
            ("educations", text(&self.educations)),
            ("gender", text(&self.gender)),
            ("category_id", ColumnValue::BigInt(self.category_id)),
        ]
    }
}

/// Request DTO for editing a provider (admin); absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateProviderDto {
    #[validate(length(min = 1, max = 255, message = "Provider name must be 1-255 characters"))]
    pub provider_name: Option<String>,
    #[validate(length(max = 255))]
    pub specialty: Option<String>,
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
    pub insurances: Option<String>,
    pub practice_names: Option<String>,
    pub languages: Option<String>,
    #[validate(regex(
        path = *crate::shared::validation::NPI_REGEX,
        message = "NPI number must be 10 digits"
    ))]
    pub npi_number: Option<String>,
    #[validate(length(max = 500))]
    pub website: Option<String>,
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    #[validate(length(max = 500))]
    pub works_for: Option<String>,
    pub popular_visit_reasons: Option<String>,
    pub educations: Option<String>,
    #[validate(length(max = 32))]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<i64>)]
    pub category_id: Option<Option<i64>>,
    pub is_premium: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>, format = Date)]
    pub premium_expires: Option<Option<NaiveDate>>,
    pub status: Option<ListingStatus>,
}

impl ListingPatch for UpdateProviderDto {
    fn category_id(&self) -> Option<Option<i64>> {
        self.category_id
    }

    fn status(&self) -> Option<ListingStatus> {
        self.status
    }

    fn columns(&self) -> Vec<Column> {
        let mut columns = Vec::new();
        if let Some(name) = &self.provider_name {
            columns.push((
                "provider_name",
                ColumnValue::Text(Some(name.trim().to_string())),
            ));
        }
        let texts = [
            ("specialty", &self.specialty),
            ("email", &self.email),
            ("street_address", &self.street_address),
            ("city", &self.city),
            ("state", &self.state),
            ("zip", &self.zip),
            ("description", &self.description),
            ("insurances", &self.insurances),
            ("practice_names", &self.practice_names),
            ("languages", &self.languages),
            ("npi_number", &self.npi_number),
            ("phone", &self.phone),
            ("image_url", &self.image_url),
            ("popular_visit_reasons", &self.popular_visit_reasons),
            ("educations", &self.educations),
            ("gender", &self.gender),
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
pub struct ProviderOwnerEditDto {
    #[validate(length(max = 32))]
    pub phone: Option<String>,
    #[validate(length(max = 500))]
    pub website: Option<String>,
    #[validate(length(max = 500))]
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub insurances: Option<String>,
    pub popular_visit_reasons: Option<String>,
    #[validate(length(max = 255))]
    pub street_address: Option<String>,
    #[validate(length(max = 255))]
    pub city: Option<String>,
    #[validate(length(max = 64))]
    pub state: Option<String>,
    #[validate(length(max = 32))]
    pub zip: Option<String>,
    pub practice_names: Option<String>,
    pub educations: Option<String>,
    pub languages: Option<String>,
    #[validate(length(max = 32))]
    pub gender: Option<String>,
    #[validate(regex(
        path = *crate::shared::validation::NPI_REGEX,
        message = "NPI number must be 10 digits"
    ))]
    pub npi_number: Option<String>,
    #[validate(length(max = 255))]
    pub specialty: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    #[validate(length(max = 500))]
    pub works_for: Option<String>,
}

impl OwnerEdit for ProviderOwnerEditDto {
    fn columns(&self) -> Vec<Column> {
        present_columns(
            &[
                ("phone", &self.phone),
                ("image_url", &self.image_url),
                ("description", &self.description),
                ("insurances", &self.insurances),
                ("popular_visit_reasons", &self.popular_visit_reasons),
                ("street_address", &self.street_address),
                ("city", &self.city),
                ("state", &self.state),
                ("zip", &self.zip),
                ("practice_names", &self.practice_names),
                ("educations", &self.educations),
                ("languages", &self.languages),
                ("gender", &self.gender),
                ("npi_number", &self.npi_number),
                ("specialty", &self.specialty),
                ("email", &self.email),
            ],
            &[("website", &self.website), ("works_for", &self.works_for)],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_npi_validation() {
        let bad: CreateProviderDto =
            serde_json::from_str(r#"{"provider_name": "Dr. Who", "npi_number": "12AB"}"#).unwrap();
        assert!(bad.validate().is_err());

        let good: CreateProviderDto = serde_json::from_str(
            r#"{"provider_name": "Dr. Who", "npi_number": "1234567890"}"#,
        )
        .unwrap();
        assert!(good.validate().is_ok());
    }

    #[test]
    fn test_owner_edit_npi_validated() {
        let edits: ProviderOwnerEditDto =
            serde_json::from_str(r#"{"npi_number": "123", "gender": "female"}"#).unwrap();
        assert!(edits.validate().is_err());
        let names: Vec<&str> = edits.columns().iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["gender", "npi_number"]);
    }

    #[test]
    fn test_display_name_trimmed() {
        let dto: CreateProviderDto =
            serde_json::from_str(r#"{"provider_name": "  Jane Doe MD "}"#).unwrap();
        assert_eq!(dto.display_name(), "Jane Doe MD");
    }
}
