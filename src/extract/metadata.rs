use std::collections::BTreeMap;

use scraper::Html;
use url::Url;

use super::{attr, element_text, has_rel, resolve, select_all};

#[derive(Debug, Default)]
pub(super) struct Metadata {
    pub title: Option<String>,
    pub description: Option<String>,
    pub canonical: Option<String>,
    pub robots_meta: Option<String>,
    pub open_graph: BTreeMap<String, String>,
    pub twitter_card: BTreeMap<String, String>,
    pub viewport: Option<String>,
    pub lang: Option<String>,
    pub charset: Option<String>,
    pub is_amp: bool,
    pub amp_url: Option<String>,
}

pub(super) fn extract(doc: &Html, base: Option<&Url>) -> Metadata {
    let metas = select_all(doc, "meta");
    let named = |name: &str| {
        metas
            .iter()
            .find(|m| {
                m.value()
                    .attr("name")
                    .is_some_and(|n| n.trim().eq_ignore_ascii_case(name))
            })
            .and_then(|m| attr(m, "content"))
            .map(str::to_string)
    };

    let mut open_graph = BTreeMap::new();
    let mut twitter_card = BTreeMap::new();
    for meta in &metas {
        let content = meta.value().attr("content").unwrap_or_default().to_string();
        if let Some(property) = attr(meta, "property") {
            let key = property.to_ascii_lowercase();
            if key.starts_with("og:") {
                open_graph.insert(key, content.clone());
            }
        }
        if let Some(name) = attr(meta, "name") {
            let key = name.to_ascii_lowercase();
            if key.starts_with("twitter:") {
                twitter_card.insert(key, content);
            }
        }
    }

    let title = select_all(doc, "title")
        .first()
        .map(element_text)
        .filter(|t| !t.is_empty())
        .or_else(|| open_graph.get("og:title").map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty());

    let links = select_all(doc, "link[rel]");
    let canonical = links
        .iter()
        .find(|l| has_rel(l, "canonical"))
        .and_then(|l| attr(l, "href"))
        .map(|href| resolve(base, href));
    let amp_url = links
        .iter()
        .find(|l| has_rel(l, "amphtml"))
        .and_then(|l| attr(l, "href"))
        .map(|href| resolve(base, href));

    let root = doc.root_element();
    let lang = attr(&root, "lang").map(str::to_string);
    let is_amp = root
        .value()
        .attrs()
        .any(|(name, _)| name.eq_ignore_ascii_case("amp") || name == "⚡");

    Metadata {
        title,
        description: named("description"),
        canonical,
        robots_meta: named("robots"),
        viewport: named("viewport"),
        open_graph,
        twitter_card,
        lang,
        charset: declared_charset(doc),
        is_amp,
        amp_url,
    }
}

/// `<meta charset>` first, then an `http-equiv="content-type"` declaration.
fn declared_charset(doc: &Html) -> Option<String> {
    let metas = select_all(doc, "meta");
    if let Some(charset) = metas.iter().find_map(|m| attr(m, "charset")) {
        return Some(charset.to_string());
    }
    metas
        .iter()
        .filter(|m| {
            m.value()
                .attr("http-equiv")
                .is_some_and(|v| v.trim().eq_ignore_ascii_case("content-type"))
        })
        .find_map(|m| {
            let content = m.value().attr("content")?.to_ascii_lowercase();
            let (_, charset) = content.split_once("charset=")?;
            let charset = charset.trim();
            (!charset.is_empty()).then(|| charset.to_string())
        })
}
