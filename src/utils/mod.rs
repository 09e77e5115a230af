//! Utility functions and helpers.

pub mod http;
pub mod log;

use url::Url;

/// Build `{base}/{path}?{query}` with the query pairs percent-encoded in order.
pub fn build_url(base_url: &str, path: &str, query: &[(&str, String)]) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(base_url)?.join(path)?;
    if !query.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in query {
            pairs.append_pair(key, value);
        }
    }
    Ok(url)
}

/// Value of a query parameter in an absolute or root-relative URL.
pub fn query_param(href: &str, name: &str) -> Option<String> {
    let base = Url::parse("https://placeholder.invalid/").ok()?;
    let url = base.join(href).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}

/// Path plus query of a URL, dropping scheme and host when present.
pub fn path_and_query(href: &str) -> String {
    match Url::parse(href) {
        Ok(url) => match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        },
        Err(_) => href.to_string(),
    }
}
