//! Page actions over a static HTML snapshot, used by the in-process host.

use std::collections::BTreeMap;

use relay_core::SummaryLength;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};
use url::Url;

use crate::{ActionError, ActionOutput, PageActions};

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "template"];
const MAX_FILENAME_LEN: usize = 80;

#[derive(Debug, Clone)]
pub struct HtmlPageActions {
    url: String,
    html: String,
}

impl HtmlPageActions {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

#[async_trait::async_trait]
impl PageActions for HtmlPageActions {
    async fn summarize(&self, data: Option<&Value>) -> Result<ActionOutput, ActionError> {
        let length = data
            .and_then(|d| d.get("summaryLength"))
            .and_then(|v| serde_json::from_value::<SummaryLength>(v.clone()).ok())
            .unwrap_or_default();
        let text = readable_text(&self.document());
        let sentences = split_sentences(&text);
        if sentences.is_empty() {
            return Err(ActionError::new("nothing to summarize on this page"));
        }
        let kept: Vec<&str> = sentences
            .into_iter()
            .take(length.sentence_budget())
            .collect();
        Ok(ActionOutput::with_data(
            format!("summary of {} sentence(s)", kept.len()),
            json!({ "summary": kept.join(" "), "sentences": kept.len() }),
        ))
    }

    async fn extract_text(&self, _data: Option<&Value>) -> Result<ActionOutput, ActionError> {
        let doc = self.document();
        let text = readable_text(&doc);
        if text.is_empty() {
            return Err(ActionError::new("no readable text on this page"));
        }
        let words = text.split_whitespace().count();
        Ok(ActionOutput::with_data(
            format!("extracted {words} words"),
            json!({ "title": page_title(&doc), "text": text }),
        ))
    }

    async fn extract_images(&self, _data: Option<&Value>) -> Result<ActionOutput, ActionError> {
        let doc = self.document();
        let base = Url::parse(&self.url).ok();
        let mut seen = Vec::new();
        let mut images = Vec::new();
        for img in select_all(&doc, "img[src]") {
            let Some(src) = img.value().attr("src") else {
                continue;
            };
            let src = absolutize(base.as_ref(), src);
            if seen.contains(&src) {
                continue;
            }
            seen.push(src.clone());
            let alt = img.value().attr("alt").unwrap_or_default().trim();
            images.push(json!({ "src": src, "alt": alt }));
        }
        if images.is_empty() {
            return Err(ActionError::new("no images found on this page"));
        }
        Ok(ActionOutput::with_data(
            format!("found {} image(s)", images.len()),
            json!({ "images": images }),
        ))
    }

    async fn export_pdf(&self, _data: Option<&Value>) -> Result<ActionOutput, ActionError> {
        Err(ActionError::new("PDF export is not available for this page"))
    }

    async fn export_markdown(&self, _data: Option<&Value>) -> Result<ActionOutput, ActionError> {
        let doc = self.document();
        let title = page_title(&doc);
        let body = readable_root(&doc)
            .map(|node| node.inner_html())
            .unwrap_or_else(|| doc.root_element().html());
        let markdown = html2md::parse_html(&body);
        if markdown.trim().is_empty() {
            return Err(ActionError::new("page has no content to export"));
        }
        let document = format!(
            "---\nurl: {url}\ntitle: {title}\n---\n\n{body}",
            url = self.url,
            title = title.as_deref().unwrap_or("untitled"),
            body = markdown.trim()
        );
        let filename = markdown_filename(title.as_deref());
        Ok(ActionOutput::with_data(
            format!("saved {filename}"),
            json!({ "filename": filename, "markdown": document }),
        ))
    }

    async fn social_content(&self, _data: Option<&Value>) -> Result<ActionOutput, ActionError> {
        let doc = self.document();
        let mut tags = BTreeMap::new();
        for meta in select_all(&doc, "meta[property^='og:'], meta[name^='twitter:']") {
            let element = meta.value();
            let key = element.attr("property").or_else(|| element.attr("name"));
            if let (Some(key), Some(content)) = (key, element.attr("content")) {
                tags.entry(key.to_string())
                    .or_insert_with(|| content.trim().to_string());
            }
        }
        if tags.is_empty() {
            return Err(ActionError::new("no social metadata on this page"));
        }
        Ok(ActionOutput::with_data(
            format!("found {} social tag(s)", tags.len()),
            json!(tags),
        ))
    }
}

fn select_all<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(sel) => doc.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

fn select_first<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let sel = Selector::parse(css).ok()?;
    doc.select(&sel).next()
}

fn page_title(doc: &Html) -> Option<String> {
    select_first(doc, "title")
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
}

/// `<article>`, then `<main>`, then `<body>`.
fn readable_root(doc: &Html) -> Option<ElementRef<'_>> {
    ["article", "main", "body"]
        .into_iter()
        .find_map(|css| select_first(doc, css))
}

fn readable_text(doc: &Html) -> String {
    let Some(root) = readable_root(doc) else {
        return String::new();
    };
    let mut chunks = Vec::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .is_some_and(|el| SKIPPED_ELEMENTS.contains(&el.name()))
        });
        if hidden {
            continue;
        }
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if !collapsed.is_empty() {
            chunks.push(collapsed);
        }
    }
    chunks.join(" ")
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    for (idx, ch) in text.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            let end = idx + ch.len_utf8();
            let at_boundary = text[end..].chars().next().is_none_or(char::is_whitespace);
            if at_boundary {
                let sentence = text[start..end].trim();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                start = end;
            }
        }
    }
    let tail = text[start..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

fn absolutize(base: Option<&Url>, src: &str) -> String {
    base.and_then(|b| b.join(src).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| src.to_string())
}

fn markdown_filename(title: Option<&str>) -> String {
    let mut slug = String::new();
    for ch in title.unwrap_or("page").chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    let mut slug: String = slug.trim_end_matches('-').chars().take(MAX_FILENAME_LEN).collect();
    if slug.is_empty() {
        slug.push_str("page");
    }
    format!("{slug}.md")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentences_split_on_terminal_punctuation_only() {
        let sentences = split_sentences("Version 1.2 shipped. Did it work? Yes! trailing");
        assert_eq!(
            sentences,
            vec!["Version 1.2 shipped.", "Did it work?", "Yes!", "trailing"]
        );
    }

    #[test]
    fn filenames_are_slugged_titles() {
        assert_eq!(markdown_filename(Some("Hello, World: Part 2")), "hello-world-part-2.md");
        assert_eq!(markdown_filename(Some("!!!")), "page.md");
        assert_eq!(markdown_filename(None), "page.md");
    }
}
