use super::prelude::*;
use crate::constants::LOADING_REFRESH_SECONDS;
use crate::copy::{FieldKey, ResultField};
use crate::store::ResultStore;

use super::flash::FlashMessage;

/// One result panel as the template sees it.
#[derive(Clone, Debug)]
pub(crate) struct FieldView {
    pub(crate) key: &'static str,
    pub(crate) label: &'static str,
    pub(crate) text: String,
    pub(crate) items: Vec<String>,
    pub(crate) is_list: bool,
    pub(crate) is_long: bool,
    pub(crate) char_count: usize,
    pub(crate) has_limit: bool,
    pub(crate) limit: usize,
    pub(crate) over_limit: bool,
}

impl From<ResultField> for FieldView {
    fn from(field: ResultField) -> Self {
        let char_count = field.char_count();
        let over_limit = field.over_limit();
        Self {
            key: field.key.as_str(),
            label: field.key.label(),
            is_list: !field.items.is_empty(),
            is_long: matches!(
                field.key,
                FieldKey::LongDescription | FieldKey::Description
            ),
            has_limit: field.limit.is_some(),
            limit: field.limit.unwrap_or_default(),
            char_count,
            over_limit,
            text: field.text,
            items: field.items,
        }
    }
}

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub(crate) struct HomeTemplate {
    pub(crate) variant_label: String,
    pub(crate) csrf_token: String,
    pub(crate) has_image: bool,
    pub(crate) image_summary: String,
    pub(crate) can_generate: bool,
    pub(crate) is_loading: bool,
    pub(crate) refresh_seconds: u64,
    pub(crate) has_flash: bool,
    pub(crate) flash_message: String,
    pub(crate) flash_class: String,
    pub(crate) has_notice: bool,
    pub(crate) notice: String,
    pub(crate) has_result: bool,
    pub(crate) fields: Vec<FieldView>,
    pub(crate) generated_at: String,
}

impl HomeTemplate {
    /// Builds the page from the store, consuming its pending notice.
    pub(crate) fn from_store(
        store: &mut ResultStore,
        variant_label: &str,
        csrf_token: String,
        flash: Option<FlashMessage>,
    ) -> Self {
        let notice = store.take_notice();
        let fields: Vec<FieldView> = store
            .result()
            .map(|result| result.fields().into_iter().map(FieldView::from).collect())
            .unwrap_or_default();
        let (has_flash, flash_message, flash_class) = match flash {
            Some(message) => (true, message.text.to_string(), message.class.to_string()),
            None => (false, String::new(), String::new()),
        };
        Self {
            variant_label: variant_label.to_string(),
            csrf_token,
            has_image: store.image().is_some(),
            image_summary: store
                .image()
                .map(|image| format!("{} · {}", image.media_type(), format_size(image.len())))
                .unwrap_or_default(),
            can_generate: store.can_generate(),
            is_loading: store.is_loading(),
            refresh_seconds: LOADING_REFRESH_SECONDS,
            has_flash,
            flash_message,
            flash_class,
            has_notice: notice.is_some(),
            notice: notice.unwrap_or_default(),
            has_result: !fields.is_empty(),
            fields,
            generated_at: store
                .generated_at()
                .map(|at| at.format("%H:%M:%S UTC").to_string())
                .unwrap_or_default(),
        }
    }
}

/// Formats a byte count for humans
fn format_size(bytes: usize) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KIB {
        format!("{bytes} B")
    } else if bytes_f < KIB * KIB {
        format!("{:.1} KiB", bytes_f / KIB)
    } else {
        format!("{:.1} MiB", bytes_f / (KIB * KIB))
    }
}
