//! Page analyzer
//!
//! This module turns a fetched response into a `PageRecord` and the page's
//! outgoing links. It extracts:
//! - Title, meta description, robots, viewport, lang and canonical
//! - Headings and visible-text word count plus a content hash
//! - OpenGraph / Twitter card tags, JSON-LD and microdata types
//! - Analytics tags, images without alt text, hreflang alternates
//! - Hyperlinks, deduplicated per page with an occurrence count
//!
//! Analysis is best-effort: error statuses are analyzed too, and the number
//! of recoverable parse errors is recorded rather than failing the page.

use crate::crawler::fetcher::FetchResult;
use crate::state::{AnalyticsTags, Heading, HreflangLink, LinkRecord, PageRecord};
use crate::url::{classify, normalize, LinkKind};
use scraper::{ElementRef, Html, Selector};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use url::Url;

/// Elements whose text is never visible
const HIDDEN_TEXT_ELEMENTS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Result of analyzing one response
#[derive(Debug, Clone)]
pub struct PageAnalysis {
    /// The filled-in page record
    pub record: PageRecord,

    /// Distinct links found on the page, in document order
    pub links: Vec<LinkRecord>,

    /// Crawlable link targets (internal and external), in document order
    pub children: Vec<(Url, LinkKind)>,

    /// Normalized visible text, used for duplicate detection
    pub text: String,
}

/// Analyzes a fetched page
///
/// # Arguments
///
/// * `fetch` - The response to analyze
/// * `record` - Record pre-filled with URL, depth, parent and render mode
/// * `root` - The crawl root, for link classification
///
/// # Returns
///
/// The completed analysis. Non-HTML responses only get their transport
/// metadata filled in and carry no links.
pub fn analyze(fetch: &FetchResult, mut record: PageRecord, root: &Url) -> PageAnalysis {
    record.final_url = fetch.final_url.to_string();
    record.status_code = fetch.status;
    record.content_type = fetch.content_type.clone();
    record.response_time_ms = fetch.response_time_ms;
    record.size_bytes = fetch.size_bytes;
    record.render_mode = fetch.render_mode;

    if !record.is_html() {
        return PageAnalysis {
            record,
            links: Vec::new(),
            children: Vec::new(),
            text: String::new(),
        };
    }

    let document = Html::parse_document(&fetch.body);
    let base_url = base_url(&document, &fetch.final_url);

    record.parse_errors = document.errors.len();
    record.title = extract_title(&document);
    record.lang = select_all(&document, "html")
        .first()
        .and_then(|html| html.value().attr("lang"))
        .map(|lang| lang.trim().to_string())
        .filter(|lang| !lang.is_empty());
    record.headings = extract_headings(&document);

    extract_meta(&document, &mut record);
    extract_link_elements(&document, &base_url, &mut record);
    extract_structured_data(&document, &mut record);
    extract_images(&document, &mut record);
    record.analytics = detect_analytics(&fetch.body);

    let words = visible_words(&document);
    record.word_count = words.len();
    let text = words.join(" ").to_lowercase();
    record.content_hash = if text.is_empty() {
        None
    } else {
        Some(hex::encode(Sha256::digest(text.as_bytes())))
    };

    let (links, children) =
        extract_links(&document, &base_url, &fetch.final_url, root, &record.url);
    record.outbound_links = links.len();
    record.internal_links = links
        .iter()
        .filter(|l| l.link_type == LinkKind::Internal)
        .count();
    record.external_links = links
        .iter()
        .filter(|l| l.link_type == LinkKind::External)
        .count();

    PageAnalysis {
        record,
        links,
        children,
        text,
    }
}

/// Selects elements, treating an unparsable selector as matching nothing
fn select_all<'a>(document: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(selector) => document.select(&selector).collect(),
        Err(_) => Vec::new(),
    }
}

/// Collapses runs of whitespace into single spaces
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(element: &ElementRef) -> String {
    collapse_whitespace(&element.text().collect::<String>())
}

/// `<base href>` resolved against the response URL, if present
fn base_url(document: &Html, final_url: &Url) -> Url {
    select_all(document, "base[href]")
        .first()
        .and_then(|base| base.value().attr("href"))
        .and_then(|href| final_url.join(href.trim()).ok())
        .unwrap_or_else(|| final_url.clone())
}

fn extract_title(document: &Html) -> Option<String> {
    select_all(document, "title")
        .first()
        .map(element_text)
        .filter(|s| !s.is_empty())
}

fn extract_headings(document: &Html) -> Vec<Heading> {
    select_all(document, "h1, h2, h3, h4, h5, h6")
        .iter()
        .filter_map(|element| {
            let level = element.value().name().get(1..)?.parse::<u8>().ok()?;
            Some(Heading {
                level,
                text: element_text(element),
            })
        })
        .collect()
}

/// Meta tags: description, viewport, robots, OpenGraph and Twitter cards
fn extract_meta(document: &Html, record: &mut PageRecord) {
    for meta in select_all(document, "meta") {
        let element = meta.value();
        let Some(content) = element.attr("content").map(str::trim) else {
            continue;
        };
        let name = element.attr("name").unwrap_or("").trim().to_lowercase();
        let property = element.attr("property").unwrap_or("").trim().to_lowercase();

        match name.as_str() {
            "description" if record.meta_description.is_none() => {
                record.meta_description = Some(content.to_string());
            }
            "viewport" if record.viewport.is_none() => {
                record.viewport = Some(content.to_string());
            }
            "robots" if record.robots.is_none() => {
                record.robots = Some(content.to_string());
            }
            _ => {}
        }

        for key in [&property, &name] {
            if key.starts_with("og:") {
                record
                    .og_tags
                    .entry(key.clone())
                    .or_insert_with(|| content.to_string());
            } else if key.starts_with("twitter:") {
                record
                    .twitter_tags
                    .entry(key.clone())
                    .or_insert_with(|| content.to_string());
            }
        }
    }
}

/// Canonical and hreflang `<link>` elements
fn extract_link_elements(document: &Html, base_url: &Url, record: &mut PageRecord) {
    for link in select_all(document, "link[rel][href]") {
        let element = link.value();
        let rel = element.attr("rel").unwrap_or("").to_lowercase();
        let Some(href) = element.attr("href").map(str::trim) else {
            continue;
        };
        let resolved = match base_url.join(href) {
            Ok(url) => url.to_string(),
            Err(_) => continue,
        };

        let rels: Vec<&str> = rel.split_whitespace().collect();
        if rels.contains(&"canonical") && record.canonical_url.is_none() {
            record.canonical_url = Some(resolved.clone());
        }
        if rels.contains(&"alternate") {
            if let Some(lang) = element.attr("hreflang") {
                record.hreflang.push(HreflangLink {
                    lang: lang.trim().to_string(),
                    href: resolved,
                });
            }
        }
    }
}

/// JSON-LD blocks and microdata item types
fn extract_structured_data(document: &Html, record: &mut PageRecord) {
    let mut types: Vec<String> = Vec::new();

    for script in select_all(document, "script[type]") {
        let script_type = script.value().attr("type").unwrap_or("").trim().to_lowercase();
        if script_type != "application/ld+json" {
            continue;
        }
        record.json_ld_blocks += 1;

        let body = script.text().collect::<String>();
        match serde_json::from_str::<serde_json::Value>(&body) {
            Ok(value) => collect_json_ld_types(&value, &mut types),
            Err(e) => tracing::debug!("Unparsable JSON-LD on {}: {}", record.url, e),
        }
    }

    for item in select_all(document, "[itemtype]") {
        let Some(itemtype) = item.value().attr("itemtype") else {
            continue;
        };
        for url in itemtype.split_whitespace() {
            if let Some(name) = url.trim_end_matches('/').rsplit('/').next() {
                if !name.is_empty() {
                    types.push(name.to_string());
                }
            }
        }
    }

    for schema_type in types {
        if !record.schema_types.contains(&schema_type) {
            record.schema_types.push(schema_type);
        }
    }
}

fn collect_json_ld_types(value: &serde_json::Value, types: &mut Vec<String>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                collect_json_ld_types(item, types);
            }
        }
        serde_json::Value::Object(map) => {
            match map.get("@type") {
                Some(serde_json::Value::String(name)) => types.push(name.clone()),
                Some(serde_json::Value::Array(names)) => types.extend(
                    names
                        .iter()
                        .filter_map(|n| n.as_str())
                        .map(str::to_string),
                ),
                _ => {}
            }
            if let Some(graph) = map.get("@graph") {
                collect_json_ld_types(graph, types);
            }
        }
        _ => {}
    }
}

fn extract_images(document: &Html, record: &mut PageRecord) {
    for image in select_all(document, "img") {
        record.images += 1;
        let has_alt = image
            .value()
            .attr("alt")
            .map_or(false, |alt| !alt.trim().is_empty());
        if !has_alt {
            record.images_missing_alt += 1;
        }
    }
}

/// Finds an identifier like `G-ABC123` or `GTM-XYZ` in raw markup
fn find_tag_id(html: &str, prefix: &str) -> Option<String> {
    let mut offset = 0;
    while let Some(found) = html[offset..].find(prefix) {
        let start = offset + found;
        let preceded_ok = html[..start]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_ascii_alphanumeric() && c != '-' && c != '_');
        let id_len = html[start + prefix.len()..]
            .chars()
            .take_while(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            .count();

        if preceded_ok && id_len >= 4 {
            return Some(html[start..start + prefix.len() + id_len].to_string());
        }
        offset = start + prefix.len();
    }
    None
}

/// Detects tracking scripts by their loader URLs and call signatures
pub fn detect_analytics(html: &str) -> AnalyticsTags {
    let lower = html.to_lowercase();

    AnalyticsTags {
        google_analytics: lower.contains("google-analytics.com/analytics.js")
            || lower.contains("google-analytics.com/ga.js")
            || lower.contains("ga('create'")
            || lower.contains("ga(\"create\""),
        gtag: lower.contains("googletagmanager.com/gtag/js") || lower.contains("gtag("),
        ga4_id: find_tag_id(html, "G-"),
        gtm_id: find_tag_id(html, "GTM-"),
        facebook_pixel: (lower.contains("connect.facebook.net") && lower.contains("fbevents.js"))
            || lower.contains("fbq("),
        hotjar: lower.contains("static.hotjar.com") || lower.contains("hotjar.com/c/hotjar"),
        mixpanel: lower.contains("cdn.mxpnl.com") || lower.contains("mixpanel.init"),
    }
}

/// Words of the visible text in document order
fn visible_words(document: &Html) -> Vec<String> {
    let mut words = Vec::new();

    for node in document.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |e| HIDDEN_TEXT_ELEMENTS.contains(&e.name()))
        });
        if hidden {
            continue;
        }
        words.extend(text.split_whitespace().map(str::to_string));
    }

    words
}

/// Anchor text, falling back to `aria-label` and then image alt text
fn anchor_text(element: &ElementRef) -> String {
    let text = element_text(element);
    if !text.is_empty() {
        return text;
    }
    if let Some(label) = element.value().attr("aria-label") {
        let label = collapse_whitespace(label);
        if !label.is_empty() {
            return label;
        }
    }
    match Selector::parse("img[alt]") {
        Ok(selector) => element
            .select(&selector)
            .filter_map(|img| img.value().attr("alt"))
            .map(collapse_whitespace)
            .find(|alt| !alt.is_empty())
            .unwrap_or_default(),
        Err(_) => String::new(),
    }
}

/// Extracts `<a href>` links, deduplicated by target
///
/// # Link Extraction Rules
///
/// **Skipped:**
/// - empty and bare `#` hrefs
/// - `javascript:`, `mailto:`, `tel:` and `data:` links
/// - `<a href="..." download>`
/// - hrefs that do not normalize to an http(s) URL
///
/// **Fragments:** `#section` hrefs are recorded as anchors on the page itself
/// and never crawled.
fn extract_links(
    document: &Html,
    base_url: &Url,
    final_url: &Url,
    root: &Url,
    source_url: &str,
) -> (Vec<LinkRecord>, Vec<(Url, LinkKind)>) {
    let mut links: Vec<LinkRecord> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut children = Vec::new();

    for element in select_all(document, "a[href]") {
        if element.value().attr("download").is_some() {
            continue;
        }
        let Some(href) = element.value().attr("href").map(str::trim) else {
            continue;
        };
        if href.is_empty() || href == "#" {
            continue;
        }
        let lower = href.to_lowercase();
        if ["javascript:", "mailto:", "tel:", "data:"]
            .iter()
            .any(|scheme| lower.starts_with(scheme))
        {
            continue;
        }

        let (target, kind, crawlable) = if href.starts_with('#') {
            let mut page = final_url.clone();
            page.set_fragment(None);
            (format!("{}{}", page, href), LinkKind::Anchor, None)
        } else {
            match normalize(href, Some(base_url)) {
                Ok(url) => {
                    let kind = classify(&url, root);
                    let crawlable = matches!(kind, LinkKind::Internal | LinkKind::External)
                        .then(|| url.clone());
                    (url.to_string(), kind, crawlable)
                }
                Err(e) => {
                    tracing::trace!("Skipping link {} on {}: {}", href, source_url, e);
                    continue;
                }
            }
        };

        if let Some(&position) = index.get(&target) {
            links[position].occurrences += 1;
            continue;
        }

        index.insert(target.clone(), links.len());
        if let Some(url) = crawlable {
            children.push((url, kind));
        }
        links.push(LinkRecord {
            source_url: source_url.to_string(),
            target_url: target,
            link_type: kind,
            anchor_text: anchor_text(&element),
            occurrences: 1,
        });
    }

    (links, children)
}
