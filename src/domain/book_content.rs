use serde_json::Value;

use crate::domain::Pagination;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BookPage {
    pub page_number: u32,
    pub content: String,
}

/// Body of a book: either one block of text or numbered pages.
///
/// Serialises to either a JSON string or `{"pages": [...]}`, which is
/// also how it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum BookContent {
    Pages { pages: Vec<BookPage> },
    Text(String),
}

impl BookContent {
    /// Accepts plain text, JSON-encoded text holding `{pages}`, a
    /// `{pages}` object or a bare array of pages.
    pub fn from_input(value: Value) -> Result<BookContent, String> {
        let content = match value {
            Value::String(text) => match serde_json::from_str::<Value>(&text) {
                Ok(parsed @ (Value::Object(_) | Value::Array(_))) => {
                    Self::from_structured(parsed)?
                }
                _ => BookContent::Text(text),
            },
            structured @ (Value::Object(_) | Value::Array(_)) => {
                Self::from_structured(structured)?
            }
            _ => return Err("Book content must be text or a list of pages".into()),
        };
        content.validate()?;
        Ok(content)
    }

    fn from_structured(value: Value) -> Result<BookContent, String> {
        let pages = match value {
            Value::Object(mut object) => {
                object.remove("pages").ok_or("Book content is missing `pages`")?
            }
            array => array,
        };
        let mut pages: Vec<BookPage> = serde_json::from_value(pages)
            .map_err(|e| format!("Invalid book pages: {}", e))?;
        pages.sort_by_key(|p| p.page_number);
        Ok(BookContent::Pages { pages })
    }

    fn validate(&self) -> Result<(), String> {
        match self {
            BookContent::Text(text) if text.trim().is_empty() => {
                Err("Book content cannot be empty".into())
            }
            BookContent::Pages { pages } => {
                if pages.iter().any(|p| p.page_number == 0) {
                    return Err("Page numbers start at 1".into());
                }
                if pages.windows(2).any(|w| w[0].page_number == w[1].page_number) {
                    return Err("Page numbers must be unique".into());
                }
                Ok(())
            }
            BookContent::Text(_) => Ok(()),
        }
    }

    pub fn page_count(&self) -> usize {
        match self {
            BookContent::Pages { pages } => pages.len(),
            BookContent::Text(_) => 1,
        }
    }

    /// Text content is a single page, whatever the pagination asks for.
    pub fn paginate(&self, pagination: &Pagination) -> Vec<BookPage> {
        match self {
            BookContent::Pages { pages } => pages
                .iter()
                .skip(pagination.offset() as usize)
                .take(pagination.limit() as usize)
                .cloned()
                .collect(),
            BookContent::Text(text) => vec![BookPage {
                page_number: 1,
                content: text.clone(),
            }],
        }
    }

    pub fn upsert_page(
        &mut self,
        page_number: u32,
        content: String,
    ) -> Result<(), String> {
        if page_number == 0 {
            return Err("Page numbers start at 1".into());
        }
        match self {
            BookContent::Pages { pages } => {
                match pages.iter_mut().find(|p| p.page_number == page_number) {
                    Some(page) => page.content = content,
                    None => {
                        pages.push(BookPage {
                            page_number,
                            content,
                        });
                        pages.sort_by_key(|p| p.page_number);
                    }
                }
                Ok(())
            }
            BookContent::Text(_) => Err("Invalid book content format".into()),
        }
    }

    pub fn to_stored(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_stored(stored: &str) -> Result<BookContent, serde_json::Error> {
        serde_json::from_str(stored)
    }
}
