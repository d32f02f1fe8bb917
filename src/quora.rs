use crate::date::{format_date, parse_date_label, Origin};
use anyhow::{Context, Result};
use askama::Template;
use derive_builder::Builder;
use reqwest::Client;
use scraper::{Html, Selector};
use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

pub const DEFAULT_BASE_URL: &str = "https://quora.com";

const NAME_MAX: usize = 255;
const EXTENSION: &str = ".html";

#[derive(Debug, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct AnswerScraper {
    input: PathBuf,
    #[builder(default = "PathBuf::from(\".\")")]
    output_dir: PathBuf,
    origin: Origin,
    #[builder(default = "DEFAULT_BASE_URL.to_string()")]
    base_url: String,
    #[builder(default = "true")]
    write_index: bool,
    /// Maximum number of answer pages fetched at once.
    #[builder(default = "1")]
    concurrency: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerEntry {
    pub url: String,
    pub date: String,
    pub slug: String,
    pub filename: String,
}

#[derive(Debug, Default, Template)]
#[template(path = "index.html.j2")]
pub struct ScrapeResult {
    pub base_url: String,
    pub entries: Vec<AnswerEntry>,
}

impl AnswerScraper {
    pub async fn scrape(&self) -> Result<ScrapeResult> {
        let snapshot = fs::read_to_string(&self.input)
            .with_context(|| format!("failed to read {}", self.input.display()))?;
        let urls = extract_answers(&snapshot, &self.base_url);
        info!(
            "found {} answers in {}",
            urls.len(),
            self.input.display()
        );

        let client = Client::builder().gzip(true).build()?;
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut handles = vec![];
        for url in urls {
            let client = client.clone();
            let semaphore = semaphore.clone();
            let handle = tokio::spawn(async move {
                let page = async {
                    let _permit = semaphore.acquire_owned().await?;
                    download_page(&client, &url).await
                }
                .await;
                (url, page)
            });
            handles.push(handle);
        }

        fs::create_dir_all(&self.output_dir)?;
        let mut entries = vec![];
        for handle in handles {
            let (url, page) = handle.await?;
            let page = match page {
                Ok(page) => page,
                Err(e) => {
                    error!("failed to download answer from {url}: {e:#}");
                    continue;
                }
            };

            let label = extract_date_from_answer(&String::from_utf8_lossy(&page));
            let date = format_date(parse_date_label(self.origin, &label));
            debug!("date of {url}: {date}");

            let Some(slug) = question_slug(&url, &self.base_url) else {
                error!("could not find question part of {url}; skipping");
                continue;
            };
            let filename = answer_filename(&date, slug);
            let path = self.output_dir.join(&filename);
            fs::write(&path, &page)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("written: {}", path.display());

            entries.push(AnswerEntry {
                slug: slug.to_string(),
                url,
                date,
                filename,
            });
        }

        let result = ScrapeResult {
            base_url: self.base_url.clone(),
            entries,
        };

        if self.write_index {
            let path = self.output_dir.join("index.html");
            fs::write(&path, result.generate_index()?)?;
            info!("written: {}", path.display());
        }

        Ok(result)
    }
}

impl AnswerScraperBuilder {
    fn validate(&self) -> Result<(), String> {
        match self.concurrency {
            Some(0) => Err("concurrency must be at least 1".to_string()),
            _ => Ok(()),
        }
    }
}

impl ScrapeResult {
    pub fn generate_index(&self) -> Result<String> {
        Ok(self.render()?)
    }
}

pub fn extract_answers(html: &str, base_url: &str) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    document
        .select(&link_selector())
        .filter_map(|node| node.value().attr("href"))
        .filter(|href| href.starts_with('/') && href.contains("/answer/"))
        .map(|href| format!("{base_url}{href}"))
        .collect()
}

/// The label is a title-cased link reading `Written ...` or `Updated ...`.
/// Answer bodies come before it, so when the author quoted such a link the
/// last one wins.
pub fn extract_date_from_answer(html: &str) -> String {
    let document = Html::parse_document(html);
    let possible = document
        .select(&link_selector())
        .filter_map(|link| {
            let mut texts = link.text();
            match (texts.next(), texts.next()) {
                (Some(text), None) => Some(text),
                _ => None,
            }
        })
        .filter(|text| {
            is_title_case(text) && (text.contains("Written ") || text.contains("Updated "))
        })
        .map(|text| text.to_string())
        .collect::<Vec<_>>();

    if possible.len() > 1 {
        warn!("date string is ambiguous; using the last occurrence");
    }

    possible.into_iter().last().unwrap_or_else(|| {
        error!("no date string found in answer page; assuming Just Now");
        "Just Now".to_string()
    })
}

/// The question part of an answer URL, with or without a context topic:
/// `<base>/<question>/answer/<user>` or `<base>/<topic>/<question>/answer/<user>`.
pub fn question_slug<'a>(url: &'a str, base_url: &str) -> Option<&'a str> {
    let path = url.strip_prefix(base_url)?.strip_prefix('/')?;
    let segments = path.split('/').collect::<Vec<_>>();
    match segments.as_slice() {
        [slug, "answer", ..] | [_, slug, "answer", ..] if !slug.is_empty() => Some(*slug),
        _ => None,
    }
}

pub fn answer_filename(date: &str, slug: &str) -> String {
    let mut stem = format!("{date} {slug}");
    let max = NAME_MAX - EXTENSION.len();
    if stem.len() > max {
        let mut take = max;
        while !stem.is_char_boundary(take) {
            take -= 1;
        }
        stem.truncate(take);
        debug!("filename truncated to {NAME_MAX} bytes");
    }
    stem + EXTENSION
}

async fn download_page(client: &Client, url: &str) -> Result<Vec<u8>> {
    debug!("fetching {url}");
    let res = client.get(url).send().await?.error_for_status()?;
    Ok(res.bytes().await?.to_vec())
}

fn link_selector() -> Selector {
    Selector::parse("a").unwrap()
}

fn is_title_case(s: &str) -> bool {
    let mut cased = false;
    let mut prev_cased = false;
    for c in s.chars() {
        if c.is_uppercase() {
            if prev_cased {
                return false;
            }
            prev_cased = true;
            cased = true;
        } else if c.is_lowercase() {
            if !prev_cased {
                return false;
            }
            prev_cased = true;
            cased = true;
        } else {
            prev_cased = false;
        }
    }
    cased
}
