//! HTML parsing and DOM navigation.
//!
//! This module provides the [`Document`] and [`Element`] types for parsing
//! HTML and walking the parts of the tree the image extractor cares about.
//!
//! # Example
//!
//! ```rust
//! use pluck_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <div id="js_content"><img data-src="https://img/a.jpg"></div>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html).unwrap();
//! let region = doc.find_by_id("js_content").unwrap();
//! assert_eq!(region.select("img").unwrap().len(), 1);
//! ```

use scraper::{ElementRef, Html, Selector};

use crate::{PluckError, Result};

/// Represents a parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses HTML from a string.
    ///
    /// The underlying html5ever parser recovers from any malformed markup, so
    /// the only input rejected here is input with no markup at all: empty
    /// documents and plain text without a single tag.
    ///
    /// # Errors
    ///
    /// Returns [`PluckError::HtmlParseError`] when the input holds no tags.
    pub fn parse(html: &str) -> Result<Self> {
        if html.trim().is_empty() {
            return Err(PluckError::HtmlParseError("document is empty".to_string()));
        }
        if !looks_like_markup(html) {
            return Err(PluckError::HtmlParseError("document contains no markup".to_string()));
        }

        Ok(Self { html: Html::parse_document(html) })
    }

    /// Gets the raw HTML representation.
    pub fn html(&self) -> &Html {
        &self.html
    }

    /// The document's root `<html>` element.
    pub fn root(&self) -> Element<'_> {
        Element { element: self.html.root_element() }
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`PluckError::HtmlParseError`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use pluck_core::parse::Document;
    ///
    /// let html = r#"<p class="content">First</p><p class="content">Second</p>"#;
    /// let doc = Document::parse(html).unwrap();
    /// let elements = doc.select("p.content").unwrap();
    /// assert_eq!(elements.len(), 2);
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = parse_selector(selector)?;
        Ok(self.html.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Finds the first element whose `id` attribute equals `id`.
    ///
    /// Walks the tree instead of building a `#id` selector, so ids that are
    /// not valid CSS identifiers still match.
    pub fn find_by_id(&self, id: &str) -> Option<Element<'_>> {
        self.html
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().id() == Some(id))
            .map(|element| Element { element })
    }

    /// Gets the title of the document.
    ///
    /// Returns the trimmed content of the `<title>` element if present.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

/// A wrapper around scraper's ElementRef.
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Gets the value of an attribute.
    ///
    /// Returns `None` if the attribute is not present.
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name of this element.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Gets the text content of this element.
    pub fn text(&self) -> String {
        self.element.text().collect()
    }

    /// Selects descendant elements using a CSS selector, in document order.
    ///
    /// # Errors
    ///
    /// Returns [`PluckError::HtmlParseError`] if the selector is invalid.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = parse_selector(selector)?;
        Ok(self.element.select(&sel).map(|el| Element { element: el }).collect())
    }
}

fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| PluckError::HtmlParseError(format!("Invalid selector: {}", e)))
}

/// True if the input contains at least one `<` followed by a tag, comment or doctype start.
fn looks_like_markup(input: &str) -> bool {
    input
        .split('<')
        .skip(1)
        .any(|rest| rest.starts_with(|c: char| c.is_ascii_alphabetic() || c == '!' || c == '/'))
}
