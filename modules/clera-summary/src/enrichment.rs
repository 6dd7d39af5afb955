// Turning the model's citation URLs into displayable articles.
//
// Every citation yields an article: a failed or slow preview falls back to
// a "{Source}: {date}" placeholder that the quality gate hides.

use std::collections::HashSet;
use std::sync::LazyLock;
use std::time::Duration;

use ai_client::{truncate_to_char_boundary, truncate_with_ellipsis};
use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join_all;
use regex::Regex;
use tracing::{debug, warn};

use clera_common::EnrichedArticle;

use crate::sentiment;

pub const PREVIEW_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;
const MAX_BODY_BYTES: usize = 200_000;
const HEAD_LIMIT: usize = 100_000;
const USER_AGENT: &str = "Mozilla/5.0 (compatible; CleraBot/1.0; +https://askclera.com)";

const MAX_SNIPPET_CHARS: usize = 300;
const MAX_DERIVED_TITLE_CHARS: usize = 100;
const MIN_SUBSTANTIAL_SNIPPET_CHARS: usize = 30;
const INTERSTITIAL_MARKERS: &[&str] = &[
    "just a moment",
    "cloudflare",
    "ddos protection",
    "security check",
];

static OG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<meta\s+(?:[^>]*?\s)?(?:property|name)\s*=\s*["'](og:\w+|description)["'][^>]*?\scontent\s*=\s*["']([^"']*)["'][^>]*/?\s*>"#,
    )
    .unwrap()
});
static OG_REV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?i)<meta\s+(?:[^>]*?\s)?content\s*=\s*["']([^"']*)["'][^>]*?\s(?:property|name)\s*=\s*["'](og:\w+|description)["'][^>]*/?\s*>"#,
    )
    .unwrap()
});
static TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").unwrap());
static PARAGRAPH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<p[^>]*>(.*?)</p>").unwrap());
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static NUMERIC_ENTITY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|\d+);").unwrap());
static GENERIC_TITLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^:]+: [A-Z][a-z]{2} \d{1,2}, \d{4}$").unwrap());

/// What a page says about itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkPreview {
    /// Final URL after redirects.
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    /// First substantial body paragraph, tags stripped.
    pub excerpt: Option<String>,
}

#[async_trait]
pub trait LinkPreviewer: Send + Sync {
    async fn preview(&self, url: &str) -> Result<LinkPreview>;
}

pub struct HttpLinkPreviewer {
    client: reqwest::Client,
}

impl HttpLinkPreviewer {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(PREVIEW_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl LinkPreviewer for HttpLinkPreviewer {
    async fn preview(&self, url: &str) -> Result<LinkPreview> {
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await?;

        let status = response.status();
        let final_url = response.url().to_string();
        if !status.is_success() {
            bail!("{url} returned {status}");
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(true, |ct| ct.contains("html"));
        if !is_html {
            return Ok(LinkPreview {
                url: final_url,
                ..Default::default()
            });
        }

        let body = response.bytes().await?;
        let body = &body[..body.len().min(MAX_BODY_BYTES)];
        let html = String::from_utf8_lossy(body);

        let mut preview = parse_html(&html);
        preview.url = final_url;
        Ok(preview)
    }
}

/// Open Graph tags first, then `<meta name="description">`, `<title>` and
/// the first real paragraph.
pub fn parse_html(html: &str) -> LinkPreview {
    let limited = truncate_to_char_boundary(html, HEAD_LIMIT);
    let head = match limited.find("</head>") {
        Some(end) => &limited[..end],
        None => limited,
    };

    let mut og_title = None;
    let mut og_description = None;
    let mut meta_description = None;

    let pairs = OG_RE
        .captures_iter(head)
        .map(|c| (c[1].to_lowercase(), c[2].to_string()))
        .chain(
            OG_REV_RE
                .captures_iter(head)
                .map(|c| (c[2].to_lowercase(), c[1].to_string())),
        );
    for (key, value) in pairs {
        let slot = match key.as_str() {
            "og:title" => &mut og_title,
            "og:description" => &mut og_description,
            "description" => &mut meta_description,
            _ => continue,
        };
        if slot.is_none() {
            *slot = clean_text(&value);
        }
    }

    let title = og_title.or_else(|| {
        TITLE_RE
            .captures(head)
            .and_then(|c| clean_text(&c[1]))
    });

    let excerpt = PARAGRAPH_RE
        .captures_iter(html)
        .filter_map(|c| clean_text(&TAG_RE.replace_all(&c[1], " ")))
        .find(|p| p.chars().count() > MIN_SUBSTANTIAL_SNIPPET_CHARS);

    LinkPreview {
        url: String::new(),
        title,
        description: og_description.or(meta_description),
        excerpt,
    }
}

/// Decode entities, collapse whitespace; `None` when nothing is left.
fn clean_text(raw: &str) -> Option<String> {
    let decoded = decode_entities(raw);
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

fn decode_entities(s: &str) -> String {
    let numeric = NUMERIC_ENTITY_RE.replace_all(s, |c: &regex::Captures| {
        let code = &c[1];
        let value = match code.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => code.parse().ok(),
        };
        value
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    numeric
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

/// Hostname without a leading `www.`.
pub fn source_of(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .map(|h| h.strip_prefix("www.").unwrap_or(&h).to_string())
        .unwrap_or_else(|| url.to_string())
}

fn placeholder_title(source: &str, today: NaiveDate) -> String {
    let mut chars = source.chars();
    let capitalized = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => "Source".to_string(),
    };
    format!("{capitalized}: {}", today.format("%b %-d, %Y"))
}

fn is_interstitial(text: &str) -> bool {
    let lower = text.to_lowercase();
    INTERSTITIAL_MARKERS.iter().any(|m| lower.contains(m))
}

/// One enriched article for `requested_url`; `preview` is `None` when the
/// fetch failed.
pub fn build_article(
    requested_url: &str,
    preview: Option<&LinkPreview>,
    today: NaiveDate,
) -> EnrichedArticle {
    let url = preview
        .map(|p| p.url.as_str())
        .filter(|u| !u.is_empty())
        .unwrap_or(requested_url)
        .to_string();
    let source = source_of(&url);
    let placeholder = placeholder_title(&source, today);

    let description = preview.and_then(|p| p.description.as_deref());
    let excerpt = preview.and_then(|p| p.excerpt.as_deref());

    let mut title = preview
        .and_then(|p| p.title.clone())
        .or_else(|| description.map(|d| truncate_with_ellipsis(d, MAX_DERIVED_TITLE_CHARS)))
        .or_else(|| excerpt.map(|e| truncate_with_ellipsis(e, MAX_DERIVED_TITLE_CHARS)))
        .unwrap_or_else(|| placeholder.clone());
    let mut snippet = description
        .or(excerpt)
        .map(|s| truncate_with_ellipsis(s, MAX_SNIPPET_CHARS))
        .unwrap_or_default();

    let mut should_display = true;
    if is_interstitial(&title) || is_interstitial(&snippet) {
        title = placeholder;
        snippet.clear();
        should_display = false;
    } else if GENERIC_TITLE_RE.is_match(&title)
        && snippet.chars().count() <= MIN_SUBSTANTIAL_SNIPPET_CHARS
    {
        should_display = false;
    }

    let sentiment_score = sentiment::score(&format!("{title} {snippet}"));

    EnrichedArticle {
        url,
        title,
        snippet,
        source,
        sentiment_score,
        should_display,
        used_for_paragraph: None,
    }
}

/// Enrich every distinct citation concurrently, keeping first-seen order.
pub async fn enrich_citations(
    previewer: &dyn LinkPreviewer,
    urls: &[String],
    today: NaiveDate,
) -> Vec<EnrichedArticle> {
    let mut seen = HashSet::new();
    let unique: Vec<&str> = urls
        .iter()
        .map(|u| u.trim())
        .filter(|u| !u.is_empty() && seen.insert(*u))
        .collect();

    let futures = unique.into_iter().map(|url| async move {
        match tokio::time::timeout(PREVIEW_TIMEOUT, previewer.preview(url)).await {
            Ok(Ok(preview)) => build_article(url, Some(&preview), today),
            Ok(Err(e)) => {
                warn!(url, error = %e, "Link preview failed, using placeholder");
                build_article(url, None, today)
            }
            Err(_) => {
                warn!(url, "Link preview timed out, using placeholder");
                build_article(url, None, today)
            }
        }
    });

    let articles = join_all(futures).await;
    debug!(count = articles.len(), "Citations enriched");
    articles
}
