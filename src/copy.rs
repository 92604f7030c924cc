//! Marketing copy produced by a generation cycle, and the per-field view the page renders.

use serde::{Deserialize, Serialize};

use crate::constants::{META_DESCRIPTION_LIMIT, META_TITLE_LIMIT};
use crate::error::ShopcopyError;

/// The six fields the two-stage pipeline asks the copywriting model for.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MarketingCopy {
    /// Product title
    pub title: String,
    /// One or two sentence summary
    pub short_description: String,
    /// Full product description
    pub long_description: String,
    /// SEO title, should stay under 60 characters
    pub meta_title: String,
    /// SEO description, should stay under 160 characters
    pub meta_description: String,
    /// 5-7 search keywords
    pub keywords: Vec<String>,
}

/// The three fields the single-stage pipeline asks the vision model for.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct ListingCopy {
    /// Product title
    pub title: String,
    /// Product description
    pub description: String,
    /// Five tags
    pub tags: Vec<String>,
}

/// A complete result, applied to the store as one unit.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GenerationResult {
    /// Two-stage output
    Marketing(MarketingCopy),
    /// Single-stage output
    Listing(ListingCopy),
}

/// Identifies one rendered field, also the `{field}` segment of `/result/{field}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKey {
    /// Title
    Title,
    /// Short description
    ShortDescription,
    /// Long description
    LongDescription,
    /// Single-stage description
    Description,
    /// SEO title
    MetaTitle,
    /// SEO description
    MetaDescription,
    /// Keyword list
    Keywords,
    /// Tag list
    Tags,
}

impl FieldKey {
    /// Path segment form
    pub fn as_str(self) -> &'static str {
        match self {
            FieldKey::Title => "title",
            FieldKey::ShortDescription => "short-description",
            FieldKey::LongDescription => "long-description",
            FieldKey::Description => "description",
            FieldKey::MetaTitle => "meta-title",
            FieldKey::MetaDescription => "meta-description",
            FieldKey::Keywords => "keywords",
            FieldKey::Tags => "tags",
        }
    }

    /// Panel heading
    pub fn label(self) -> &'static str {
        match self {
            FieldKey::Title => "Title",
            FieldKey::ShortDescription => "Short description",
            FieldKey::LongDescription => "Long description",
            FieldKey::Description => "Description",
            FieldKey::MetaTitle => "Meta title",
            FieldKey::MetaDescription => "Meta description",
            FieldKey::Keywords => "Keywords",
            FieldKey::Tags => "Tags",
        }
    }

    /// Parses the path segment form.
    pub fn parse(value: &str) -> Option<Self> {
        [
            FieldKey::Title,
            FieldKey::ShortDescription,
            FieldKey::LongDescription,
            FieldKey::Description,
            FieldKey::MetaTitle,
            FieldKey::MetaDescription,
            FieldKey::Keywords,
            FieldKey::Tags,
        ]
        .into_iter()
        .find(|key| key.as_str() == value)
    }
}

/// One rendered panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResultField {
    /// Which field this is
    pub key: FieldKey,
    /// Text shown on the page and written to the clipboard
    pub text: String,
    /// Individual entries for list fields, empty otherwise
    pub items: Vec<String>,
    /// Soft length limit, if the field has one
    pub limit: Option<usize>,
}

impl ResultField {
    fn text(key: FieldKey, text: &str, limit: Option<usize>) -> Self {
        Self {
            key,
            text: text.to_string(),
            items: Vec::new(),
            limit,
        }
    }

    fn list(key: FieldKey, items: &[String]) -> Self {
        Self {
            key,
            text: items.join(", "),
            items: items.to_vec(),
            limit: None,
        }
    }

    /// Characters, not bytes, since that's what search engines count.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// True if the text runs past its soft limit.
    pub fn over_limit(&self) -> bool {
        self.limit
            .map(|limit| self.char_count() > limit)
            .unwrap_or(false)
    }

    /// What the copy button puts on the clipboard.
    pub fn copy_text(&self) -> &str {
        &self.text
    }
}

impl GenerationResult {
    /// Parses the two-stage copywriter's answer.
    pub fn parse_marketing(raw: &str) -> Result<Self, ShopcopyError> {
        let copy: MarketingCopy = serde_json::from_str(raw)
            .map_err(|err| ShopcopyError::MalformedResponse(err.to_string()))?;
        let result = Self::Marketing(copy);
        result.ensure_complete()?;
        Ok(result)
    }

    /// Parses the single-stage vision model's answer.
    pub fn parse_listing(raw: &str) -> Result<Self, ShopcopyError> {
        let copy: ListingCopy = serde_json::from_str(raw)
            .map_err(|err| ShopcopyError::MalformedResponse(err.to_string()))?;
        let result = Self::Listing(copy);
        result.ensure_complete()?;
        Ok(result)
    }

    /// Every field must carry something, otherwise the page would show a half-filled result.
    fn ensure_complete(&self) -> Result<(), ShopcopyError> {
        for field in self.fields() {
            let blank = if field.items.is_empty() {
                field.text.trim().is_empty()
            } else {
                field.items.iter().all(|item| item.trim().is_empty())
            };
            if blank {
                return Err(ShopcopyError::MalformedResponse(format!(
                    "field `{}` is empty",
                    field.key.as_str()
                )));
            }
        }
        Ok(())
    }

    /// Panels in display order.
    pub fn fields(&self) -> Vec<ResultField> {
        match self {
            GenerationResult::Marketing(copy) => vec![
                ResultField::text(FieldKey::Title, &copy.title, None),
                ResultField::text(FieldKey::ShortDescription, &copy.short_description, None),
                ResultField::text(FieldKey::LongDescription, &copy.long_description, None),
                ResultField::text(FieldKey::MetaTitle, &copy.meta_title, Some(META_TITLE_LIMIT)),
                ResultField::text(
                    FieldKey::MetaDescription,
                    &copy.meta_description,
                    Some(META_DESCRIPTION_LIMIT),
                ),
                ResultField::list(FieldKey::Keywords, &copy.keywords),
            ],
            GenerationResult::Listing(copy) => vec![
                ResultField::text(FieldKey::Title, &copy.title, None),
                ResultField::text(FieldKey::Description, &copy.description, None),
                ResultField::list(FieldKey::Tags, &copy.tags),
            ],
        }
    }

    /// Looks up one panel.
    pub fn field(&self, key: FieldKey) -> Option<ResultField> {
        self.fields().into_iter().find(|field| field.key == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNEAKER_JSON: &str = r#"{"title":"Red Runner Sneaker","shortDescription":"Bold red sneaker for everyday runs.","longDescription":"...","metaTitle":"Red Runner Sneaker | Shop Now","metaDescription":"...","keywords":["sneaker","running","red shoes"]}"#;

    #[test]
    fn test_parse_marketing_verbatim() {
        let result = GenerationResult::parse_marketing(SNEAKER_JSON).expect("parse copy");
        let fields = result.fields();
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[0].text, "Red Runner Sneaker");
        assert_eq!(fields[1].text, "Bold red sneaker for everyday runs.");
        assert_eq!(fields[2].text, "...");
        assert_eq!(fields[3].text, "Red Runner Sneaker | Shop Now");
        assert_eq!(fields[4].text, "...");
        assert_eq!(fields[5].items, vec!["sneaker", "running", "red shoes"]);
    }

    #[test]
    fn test_keywords_copy_as_comma_list() {
        let result = GenerationResult::parse_marketing(SNEAKER_JSON).expect("parse copy");
        let keywords = result.field(FieldKey::Keywords).expect("keywords field");
        assert_eq!(keywords.copy_text(), "sneaker, running, red shoes");
        let title = result.field(FieldKey::Title).expect("title field");
        assert_eq!(title.copy_text(), "Red Runner Sneaker");
    }

    #[test]
    fn test_non_json_is_malformed() {
        let err = GenerationResult::parse_marketing("Sure! Here is your copy: ...")
            .expect_err("not JSON");
        assert!(matches!(err, ShopcopyError::MalformedResponse(_)));
    }

    #[test]
    fn test_wrong_shape_is_malformed() {
        let err = GenerationResult::parse_marketing(r#"{"title":"Only a title"}"#)
            .expect_err("missing fields");
        assert!(matches!(err, ShopcopyError::MalformedResponse(_)));

        let err = GenerationResult::parse_listing(r#"{"title":"x","description":"y","tags":"z"}"#)
            .expect_err("tags must be a list");
        assert!(matches!(err, ShopcopyError::MalformedResponse(_)));
    }

    #[test]
    fn test_empty_fields_are_malformed() {
        let raw = r#"{"title":"","shortDescription":"a","longDescription":"b","metaTitle":"c","metaDescription":"d","keywords":["e"]}"#;
        assert!(GenerationResult::parse_marketing(raw).is_err());

        let raw = r#"{"title":"t","description":"d","tags":[]}"#;
        assert!(GenerationResult::parse_listing(raw).is_err());
    }

    #[test]
    fn test_listing_fields() {
        let raw = r#"{"title":"Mug","description":"A sturdy mug.","tags":["mug","coffee","ceramic","kitchen","gift"]}"#;
        let result = GenerationResult::parse_listing(raw).expect("parse listing");
        let keys: Vec<FieldKey> = result.fields().iter().map(|field| field.key).collect();
        assert_eq!(
            keys,
            vec![FieldKey::Title, FieldKey::Description, FieldKey::Tags]
        );
        assert!(result.field(FieldKey::MetaTitle).is_none());
    }

    #[test]
    fn test_meta_limits_flag_overflow() {
        let long_title = "x".repeat(61);
        let raw = serde_json::json!({
            "title": "t",
            "shortDescription": "s",
            "longDescription": "l",
            "metaTitle": long_title,
            "metaDescription": "é".repeat(160),
            "keywords": ["k"],
        })
        .to_string();
        let result = GenerationResult::parse_marketing(&raw).expect("parse copy");
        let meta_title = result.field(FieldKey::MetaTitle).expect("meta title");
        assert!(meta_title.over_limit());
        let meta_description = result
            .field(FieldKey::MetaDescription)
            .expect("meta description");
        assert_eq!(meta_description.char_count(), 160);
        assert!(!meta_description.over_limit());
    }

    #[test]
    fn test_field_key_round_trip() {
        assert_eq!(
            FieldKey::parse("meta-description"),
            Some(FieldKey::MetaDescription)
        );
        assert_eq!(FieldKey::parse("price"), None);
    }
}
