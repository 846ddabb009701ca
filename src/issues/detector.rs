//! Per-page SEO issue checks
//!
//! Each check inspects a finished `PageRecord` and emits zero or more
//! `IssueRecord`s. Content checks only run for HTML pages served with a 2xx
//! status; status, transport and size checks run for every page.

use crate::state::{IssueRecord, PageRecord, RenderMode, Severity};
use crate::url::normalize;

const TITLE_MAX_CHARS: usize = 60;
const TITLE_MIN_CHARS: usize = 30;
const META_DESCRIPTION_MAX_CHARS: usize = 160;
const META_DESCRIPTION_MIN_CHARS: usize = 120;
const THIN_CONTENT_WORDS: usize = 300;
const SLOW_RESPONSE_MS: u64 = 3000;
const MODERATE_RESPONSE_MS: u64 = 1000;
const LARGE_PAGE_BYTES: u64 = 3 * 1024 * 1024;
const MODERATE_PAGE_BYTES: u64 = 1024 * 1024;

/// Every issue the detector can raise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IssueKind {
    MissingTitle,
    TitleTooLong,
    TitleTooShort,
    MissingMetaDescription,
    MetaDescriptionTooLong,
    MetaDescriptionTooShort,
    MissingH1,
    ThinContent,
    ClientError,
    ServerError,
    Redirect,
    MissingCanonical,
    CanonicalMismatch,
    MissingViewport,
    MissingLang,
    ImagesMissingAlt,
    MissingOpenGraph,
    MissingTwitterCard,
    NoStructuredData,
    SlowResponse,
    ModerateResponse,
    LargePage,
    ModeratePage,
    Noindex,
    Nofollow,
    MalformedHtml,
    FetchFailed,
    DuplicateContent,
}

impl IssueKind {
    /// Stable identifier stored in `IssueRecord::issue_type`
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingTitle => "missing_title",
            Self::TitleTooLong => "title_too_long",
            Self::TitleTooShort => "title_too_short",
            Self::MissingMetaDescription => "missing_meta_description",
            Self::MetaDescriptionTooLong => "meta_description_too_long",
            Self::MetaDescriptionTooShort => "meta_description_too_short",
            Self::MissingH1 => "missing_h1",
            Self::ThinContent => "thin_content",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
            Self::Redirect => "redirect",
            Self::MissingCanonical => "missing_canonical",
            Self::CanonicalMismatch => "canonical_mismatch",
            Self::MissingViewport => "missing_viewport",
            Self::MissingLang => "missing_lang",
            Self::ImagesMissingAlt => "images_missing_alt",
            Self::MissingOpenGraph => "missing_open_graph",
            Self::MissingTwitterCard => "missing_twitter_card",
            Self::NoStructuredData => "no_structured_data",
            Self::SlowResponse => "slow_response",
            Self::ModerateResponse => "moderate_response",
            Self::LargePage => "large_page",
            Self::ModeratePage => "moderate_page",
            Self::Noindex => "noindex",
            Self::Nofollow => "nofollow",
            Self::MalformedHtml => "malformed_html",
            Self::FetchFailed => "fetch_failed",
            Self::DuplicateContent => "duplicate_content",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            Self::MissingTitle
            | Self::MissingMetaDescription
            | Self::MissingH1
            | Self::ClientError
            | Self::ServerError
            | Self::MissingViewport
            | Self::SlowResponse
            | Self::LargePage
            | Self::Noindex
            | Self::Nofollow
            | Self::FetchFailed => Severity::Error,
            Self::Redirect | Self::NoStructuredData | Self::MalformedHtml => Severity::Info,
            _ => Severity::Warning,
        }
    }

    pub fn category(&self) -> &'static str {
        match self {
            Self::MissingTitle
            | Self::TitleTooLong
            | Self::TitleTooShort
            | Self::MissingMetaDescription
            | Self::MetaDescriptionTooLong
            | Self::MetaDescriptionTooShort
            | Self::MissingH1 => "SEO",
            Self::ThinContent | Self::DuplicateContent => "Content",
            Self::ClientError
            | Self::ServerError
            | Self::Redirect
            | Self::MissingCanonical
            | Self::CanonicalMismatch
            | Self::MalformedHtml
            | Self::FetchFailed => "Technical",
            Self::MissingViewport => "Mobile",
            Self::MissingLang | Self::ImagesMissingAlt => "Accessibility",
            Self::MissingOpenGraph | Self::MissingTwitterCard => "Social",
            Self::NoStructuredData => "Structured Data",
            Self::SlowResponse | Self::ModerateResponse | Self::LargePage | Self::ModeratePage => {
                "Performance"
            }
            Self::Noindex | Self::Nofollow => "Indexability",
        }
    }

    /// Builds a record of this kind for `url`
    pub fn issue(&self, url: &str, detail: impl Into<String>) -> IssueRecord {
        IssueRecord {
            url: url.to_string(),
            issue_type: self.as_str().to_string(),
            severity: self.severity(),
            category: self.category().to_string(),
            detail: detail.into(),
        }
    }
}

/// Reason phrase for common HTTP status codes
pub fn status_message(status: u16) -> String {
    let message = match status {
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        408 => "Request Timeout",
        410 => "Gone",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        505 => "HTTP Version Not Supported",
        _ => return format!("HTTP {} Error", status),
    };
    format!("{} {}", status, message)
}

/// Runs every applicable check against a page record
pub fn detect_issues(record: &PageRecord) -> Vec<IssueRecord> {
    let mut issues = Vec::new();

    check_transport(record, &mut issues);
    check_status(record, &mut issues);
    check_performance(record, &mut issues);

    let content_page = record.error.is_none()
        && (200..300).contains(&record.status_code)
        && record.is_html();
    if content_page {
        check_title(record, &mut issues);
        check_meta_description(record, &mut issues);
        check_content(record, &mut issues);
        check_canonical(record, &mut issues);
        check_mobile_and_accessibility(record, &mut issues);
        check_social_and_structured_data(record, &mut issues);
        check_indexability(record, &mut issues);
    }

    issues
}

// Error statuses are reported by check_status
fn check_transport(record: &PageRecord, issues: &mut Vec<IssueRecord>) {
    if record.status_code != 0 {
        return;
    }
    let detail = record.error.as_deref().unwrap_or("No response received");
    issues.push(IssueKind::FetchFailed.issue(&record.url, detail));
}

fn check_status(record: &PageRecord, issues: &mut Vec<IssueRecord>) {
    let status = record.status_code;
    match status {
        300..=399 => issues.push(IssueKind::Redirect.issue(
            &record.url,
            format!("{} URL redirects to another location", status),
        )),
        400..=499 => {
            issues.push(IssueKind::ClientError.issue(&record.url, status_message(status)))
        }
        500..=599 => {
            issues.push(IssueKind::ServerError.issue(&record.url, status_message(status)))
        }
        _ => {}
    }
}

fn check_performance(record: &PageRecord, issues: &mut Vec<IssueRecord>) {
    if record.status_code > 0 && record.render_mode == RenderMode::Plain {
        let ms = record.response_time_ms;
        if ms > SLOW_RESPONSE_MS {
            issues.push(IssueKind::SlowResponse.issue(
                &record.url,
                format!("Page took {}ms to respond (recommended: <{}ms)", ms, SLOW_RESPONSE_MS),
            ));
        } else if ms > MODERATE_RESPONSE_MS {
            issues.push(IssueKind::ModerateResponse.issue(
                &record.url,
                format!("Page took {}ms to respond (recommended: <{}ms)", ms, MODERATE_RESPONSE_MS),
            ));
        }
    }

    let megabytes = record.size_bytes as f64 / 1024.0 / 1024.0;
    if record.size_bytes > LARGE_PAGE_BYTES {
        issues.push(IssueKind::LargePage.issue(
            &record.url,
            format!("Page size is {:.1}MB (recommended: <3MB)", megabytes),
        ));
    } else if record.size_bytes > MODERATE_PAGE_BYTES {
        issues.push(IssueKind::ModeratePage.issue(
            &record.url,
            format!("Page size is {:.1}MB (recommended: <1MB)", megabytes),
        ));
    }
}

fn check_title(record: &PageRecord, issues: &mut Vec<IssueRecord>) {
    let Some(title) = record.title.as_deref().filter(|t| !t.is_empty()) else {
        issues.push(IssueKind::MissingTitle.issue(&record.url, "Page has no title tag"));
        return;
    };

    let length = title.chars().count();
    if length > TITLE_MAX_CHARS {
        issues.push(IssueKind::TitleTooLong.issue(
            &record.url,
            format!("Title is {} characters (recommended: <={})", length, TITLE_MAX_CHARS),
        ));
    } else if length < TITLE_MIN_CHARS {
        issues.push(IssueKind::TitleTooShort.issue(
            &record.url,
            format!(
                "Title is {} characters (recommended: {}-{})",
                length, TITLE_MIN_CHARS, TITLE_MAX_CHARS
            ),
        ));
    }
}

fn check_meta_description(record: &PageRecord, issues: &mut Vec<IssueRecord>) {
    let Some(description) = record.meta_description.as_deref().filter(|d| !d.is_empty()) else {
        issues.push(
            IssueKind::MissingMetaDescription.issue(&record.url, "Page has no meta description"),
        );
        return;
    };

    let length = description.chars().count();
    if length > META_DESCRIPTION_MAX_CHARS {
        issues.push(IssueKind::MetaDescriptionTooLong.issue(
            &record.url,
            format!(
                "Description is {} characters (recommended: <={})",
                length, META_DESCRIPTION_MAX_CHARS
            ),
        ));
    } else if length < META_DESCRIPTION_MIN_CHARS {
        issues.push(IssueKind::MetaDescriptionTooShort.issue(
            &record.url,
            format!(
                "Description is {} characters (recommended: {}-{})",
                length, META_DESCRIPTION_MIN_CHARS, META_DESCRIPTION_MAX_CHARS
            ),
        ));
    }
}

fn check_content(record: &PageRecord, issues: &mut Vec<IssueRecord>) {
    if record.h1().map_or(true, str::is_empty) {
        issues.push(IssueKind::MissingH1.issue(&record.url, "Page has no H1 heading"));
    }

    if record.word_count < THIN_CONTENT_WORDS {
        issues.push(IssueKind::ThinContent.issue(
            &record.url,
            format!(
                "Page has only {} words (recommended: >={})",
                record.word_count, THIN_CONTENT_WORDS
            ),
        ));
    }

    if record.parse_errors > 0 {
        issues.push(IssueKind::MalformedHtml.issue(
            &record.url,
            format!("HTML parser reported {} errors", record.parse_errors),
        ));
    }
}

fn check_canonical(record: &PageRecord, issues: &mut Vec<IssueRecord>) {
    let Some(canonical) = record.canonical_url.as_deref() else {
        issues.push(
            IssueKind::MissingCanonical.issue(&record.url, "Page has no canonical URL specified"),
        );
        return;
    };

    let same = match (normalize(canonical, None), normalize(&record.url, None)) {
        (Ok(a), Ok(b)) => a == b,
        _ => canonical == record.url,
    };
    if !same {
        issues.push(
            IssueKind::CanonicalMismatch
                .issue(&record.url, format!("Canonical points to: {}", canonical)),
        );
    }
}

fn check_mobile_and_accessibility(record: &PageRecord, issues: &mut Vec<IssueRecord>) {
    if record.viewport.as_deref().map_or(true, str::is_empty) {
        issues.push(
            IssueKind::MissingViewport.issue(&record.url, "Page is not mobile-optimized"),
        );
    }

    if record.lang.is_none() {
        issues.push(IssueKind::MissingLang.issue(&record.url, "HTML tag has no lang attribute"));
    }

    if record.images_missing_alt > 0 {
        issues.push(IssueKind::ImagesMissingAlt.issue(
            &record.url,
            format!(
                "{} of {} images lack alt text",
                record.images_missing_alt, record.images
            ),
        ));
    }
}

fn check_social_and_structured_data(record: &PageRecord, issues: &mut Vec<IssueRecord>) {
    if record.og_tags.is_empty() {
        issues.push(IssueKind::MissingOpenGraph.issue(
            &record.url,
            "Page has no OpenGraph tags for social sharing",
        ));
    }

    if record.twitter_tags.is_empty() {
        issues.push(
            IssueKind::MissingTwitterCard.issue(&record.url, "Page has no Twitter Card tags"),
        );
    }

    if record.json_ld_blocks == 0 && record.schema_types.is_empty() {
        issues.push(
            IssueKind::NoStructuredData
                .issue(&record.url, "Page has no JSON-LD or Schema.org markup"),
        );
    }
}

fn check_indexability(record: &PageRecord, issues: &mut Vec<IssueRecord>) {
    let robots = record.robots.as_deref().unwrap_or("").to_lowercase();

    if robots.contains("noindex") {
        issues.push(IssueKind::Noindex.issue(
            &record.url,
            "Page is blocked from search engines by a noindex directive",
        ));
    }

    if robots.contains("nofollow") {
        issues.push(IssueKind::Nofollow.issue(
            &record.url,
            "Links on this page are not followed by search engines (nofollow directive)",
        ));
    }
}
