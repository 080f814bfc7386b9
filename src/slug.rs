//! Domain names: normalization and unique allocation.

use std::collections::HashSet;
use std::sync::LazyLock;

use rand::Rng;
use unicode_normalization::UnicodeNormalization;

pub const DEFAULT_MAX_TRIES: usize = 50;

const MAX_BASE_LEN: usize = 30;
const RANDOM_TRIES: usize = 100;
const RANDOM_SUFFIX_BOUND: u32 = 10_000;
const FALLBACK_BASE: &str = "user";

/// Route segments that live at the same level as a member's domain name,
/// plus well-known files served from the site root.
const RESERVED_PATHS: &[&str] = &[
    "",
    "posts",
    "archive",
    "not-found",
    "order-management",
    "my-commission-requests",
    "talent-hub",
    "badges",
    "orders",
    "characters",
    "commission-hub",
    "oc-universe",
    "galaxies",
    "newss",
    "search",
    "threads",
    "paypal",
    "dashboard",
    "auth",
    "statics",
    "error",
    "forbidden",
    "favicon.ico",
    "robots.txt",
    "sitemap.xml",
];

static RESERVED: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| RESERVED_PATHS.iter().copied().collect());

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid base for domain name: {0:?}")]
    InvalidBase(String),
}

pub fn is_reserved(candidate: &str) -> bool {
    RESERVED.contains(candidate.to_lowercase().as_str())
}

pub fn reserved_paths() -> Vec<&'static str> {
    let mut paths = RESERVED_PATHS.to_vec();
    paths.sort_unstable();
    paths
}

fn is_combining_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}

/// Fold `base` to the allocator alphabet: lowercase ASCII letters and
/// digits only, accents folded to their base letter, at most 30 chars.
pub fn clean_base(base: &str) -> Result<String, Error> {
    let clean: String = base
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .take(MAX_BASE_LEN)
        .collect();

    if clean.is_empty() {
        return Err(Error::InvalidBase(base.to_string()));
    }
    Ok(clean)
}

/// Hyphen-preserving variant of [`clean_base`]. Runs of other characters
/// become a single `-`, edges are trimmed, and an empty result falls back
/// to `"user"`.
pub fn sanitize_domain_base(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.to_lowercase().nfkd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            out.push(c);
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }

    let trimmed = out.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK_BASE.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Allocate a domain name derived from `base` that is neither reserved nor
/// taken according to `exists`.
///
/// Candidates are `base`, `base1`, `base2`, ... up to `max_tries`, then up
/// to 100 random numeric suffixes, then `base` followed by the current epoch
/// milliseconds. The last step is not checked against `exists`, so the call
/// always terminates with a name; callers that need strict uniqueness must
/// also enforce it at write time.
///
/// `exists` is awaited once per candidate, never concurrently. An error from
/// it aborts allocation and is returned as is.
pub async fn allocate<F, Fut>(base: &str, mut exists: F, max_tries: usize) -> anyhow::Result<String>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = anyhow::Result<bool>>,
{
    let clean = clean_base(base)?;

    for i in 0..max_tries {
        let probe = if i == 0 {
            clean.clone()
        } else {
            format!("{clean}{i}")
        };
        if is_reserved(&probe) {
            tracing::debug!(%probe, "skipping reserved domain name");
            continue;
        }
        if !exists(probe.clone()).await? {
            return Ok(probe);
        }
    }

    tracing::debug!(base = %clean, max_tries, "sequential suffixes exhausted");

    for _ in 0..RANDOM_TRIES {
        let suffix = rand::rng().random_range(0..RANDOM_SUFFIX_BOUND);
        let probe = format!("{clean}{suffix}");
        if is_reserved(&probe) {
            continue;
        }
        if !exists(probe.clone()).await? {
            return Ok(probe);
        }
    }

    let probe = format!("{clean}{}", chrono::Utc::now().timestamp_millis());
    tracing::warn!(domain = %probe, "random suffixes exhausted, using timestamp suffix");
    Ok(probe)
}
