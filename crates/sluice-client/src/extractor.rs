use scraper::{Html, Selector};
use sluice_core::models::ExtractedItem;
use sluice_core::traits::ItemExtractor;
use url::Url;

pub const DEFAULT_ID_PARAM: &str = "item";
pub const DEFAULT_ELEMENT_ID_TEMPLATE: &str = "tooltip{id}-generic";

/// Extracts one element, located by a derived `id` attribute, from a page.
///
/// The item identifier is the value of a query parameter of the final URL
/// (`?item=1234` gives `1234`); the element id is the template with `{id}`
/// substituted (`tooltip1234-generic`). The element's outer HTML becomes the
/// extracted item.
#[derive(Debug, Clone)]
pub struct FragmentExtractor {
    id_param: String,
    element_id_template: String,
}

impl FragmentExtractor {
    pub fn new(id_param: impl Into<String>, element_id_template: impl Into<String>) -> Self {
        Self {
            id_param: id_param.into(),
            element_id_template: element_id_template.into(),
        }
    }

    /// Identifier carried by the response URL, if any.
    pub fn item_id(&self, final_url: &str) -> Option<String> {
        let url = Url::parse(final_url).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == self.id_param.as_str())
            .map(|(_, value)| value.into_owned())
            .filter(|value| !value.is_empty())
    }

    pub fn element_id(&self, item_id: &str) -> String {
        self.element_id_template.replace("{id}", item_id)
    }

    fn selector_for(element_id: &str) -> Option<Selector> {
        let escaped = element_id.replace('\\', "\\\\").replace('"', "\\\"");
        match Selector::parse(&format!("[id=\"{escaped}\"]")) {
            Ok(selector) => Some(selector),
            Err(e) => {
                tracing::warn!(%element_id, error = ?e, "Unusable element id");
                None
            }
        }
    }
}

impl Default for FragmentExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PARAM, DEFAULT_ELEMENT_ID_TEMPLATE)
    }
}

impl ItemExtractor for FragmentExtractor {
    fn extract(&self, body: &str, final_url: &str) -> Option<ExtractedItem> {
        let id = self.item_id(final_url)?;
        let selector = Self::selector_for(&self.element_id(&id))?;

        let document = Html::parse_document(body);
        let element = document.select(&selector).next()?;

        Some(ExtractedItem {
            id,
            url: final_url.to_string(),
            html: element.html(),
        })
    }
}
