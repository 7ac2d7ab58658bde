use mirror_core::Content;
use scraper::{ElementRef, Html, Selector};

/// CSS selectors for the three markers of a post page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentSelectors {
    pub title: String,
    pub body: String,
    pub created_at: String,
}

impl Default for ContentSelectors {
    fn default() -> Self {
        Self {
            title: "div.POST_TTL".to_string(),
            body: "div.POST_BODY".to_string(),
            created_at: "a.time".to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("invalid selector {selector:?}: {message}")]
pub struct SelectorError {
    pub selector: String,
    pub message: String,
}

/// Maps archived post HTML to [`Content`]:
/// - title container text (required)
/// - body container inner HTML (required)
/// - time element text (optional)
///
/// A page missing a required marker is not an error: `parse` returns `None` so the
/// caller can try another snapshot.
#[derive(Debug, Clone)]
pub struct ContentParser {
    selectors: ContentSelectors,
    title: Selector,
    body: Selector,
    created_at: Selector,
}

fn compile(selector: &str) -> Result<Selector, SelectorError> {
    Selector::parse(selector).map_err(|err| SelectorError {
        selector: selector.to_string(),
        message: err.to_string(),
    })
}

impl ContentParser {
    /// Compiles every selector up front; `parse` reuses them for each page.
    pub fn new(selectors: ContentSelectors) -> Result<Self, SelectorError> {
        Ok(Self {
            title: compile(&selectors.title)?,
            body: compile(&selectors.body)?,
            created_at: compile(&selectors.created_at)?,
            selectors,
        })
    }

    pub fn selectors(&self) -> &ContentSelectors {
        &self.selectors
    }

    pub fn parse(&self, html: &str) -> Option<Content> {
        let doc = Html::parse_document(html);
        let title = doc.select(&self.title).next()?;
        let body = doc.select(&self.body).next()?;
        let created_at = doc
            .select(&self.created_at)
            .next()
            .map(text_of)
            .filter(|text| !text.is_empty());

        Some(Content {
            title: text_of(title),
            body: body.inner_html(),
            created_at,
        })
    }
}

impl Default for ContentParser {
    fn default() -> Self {
        Self::new(ContentSelectors::default()).expect("default selectors are valid")
    }
}

fn text_of(node: ElementRef<'_>) -> String {
    node.text().collect::<String>().trim().to_string()
}
