//! Checks rendered pages for internal links and image sources that point nowhere.

use std::{
    collections::{BTreeMap, HashSet},
    path::{Path, PathBuf},
};

use percent_encoding::percent_decode_str;
use url::Url;

use crate::{config::ReportingSeverity, Ctx};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkKind {
    /// `href` of an `<a>`.
    Anchor,
    /// `src` of an `<img>`.
    Image,
    /// `href` of a `<link>`, like the favicon or a stylesheet.
    Resource,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub kind: LinkKind,
    pub href: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BrokenLink {
    /// The page the link is on, relative to the output directory.
    pub page: PathBuf,
    pub kind: LinkKind,
    pub href: String,
}

#[derive(thiserror::Error, Debug)]
pub enum LinkError {
    #[error("{} broken link(s) found:\n{}", .0.len(), group_by_page(.0))]
    Broken(Vec<BrokenLink>),
}

fn group_by_page(broken: &[BrokenLink]) -> String {
    let mut by_page: BTreeMap<&Path, Vec<&str>> = BTreeMap::new();
    for link in broken {
        by_page.entry(&link.page).or_default().push(&link.href);
    }

    let mut message = String::new();
    for (page, hrefs) in by_page {
        message.push_str(&format!("- on page {}:\n", page.display()));
        for href in hrefs {
            message.push_str(&format!("  -> linking to {href}\n"));
        }
    }
    message
}

/// Collect the `href` of every `<a>` and `<link>`, and the `src` of every `<img>` in a page.
pub fn collect_links(html: &str) -> anyhow::Result<Vec<Link>> {
    let dom = tl::parse(html, tl::ParserOptions::default())
        .map_err(|err| anyhow::anyhow!("parsing HTML: {err}"))?;

    let links = dom
        .nodes()
        .iter()
        .filter_map(|node| node.as_tag())
        .filter_map(|tag| {
            let (kind, attribute) = match &*tag.name().as_utf8_str() {
                "a" => (LinkKind::Anchor, "href"),
                "img" => (LinkKind::Image, "src"),
                "link" => (LinkKind::Resource, "href"),
                _ => return None,
            };
            let href = tag.attributes().get(attribute).flatten()?;
            Some(Link {
                kind,
                href: href.as_utf8_str().replace("&amp;", "&"),
            })
        })
        .collect();

    Ok(links)
}

/// Resolve an internal link on the page at `page_route` into a path relative to the site root.
/// Returns `None` for links that do not point into this site.
fn resolve(base_url: &str, page_route: &str, href: &str) -> Option<String> {
    // Links with a scheme (`https:`, `mailto:`, ...) parse on their own.
    if href.is_empty() || href.starts_with('#') || href.starts_with("//") || Url::parse(href).is_ok()
    {
        return None;
    }

    let page = Url::parse("http://site.invalid").ok()?.join(page_route).ok()?;
    let resolved = page.join(href).ok()?;
    let path = percent_decode_str(resolved.path()).decode_utf8_lossy();

    let base_url = base_url.trim_end_matches('/');
    let rest = path.strip_prefix(base_url)?;
    if !(rest.is_empty() || rest.starts_with('/')) {
        return None;
    }

    Some(rest.trim_start_matches('/').to_owned())
}

/// The files a resolved link may be served from.
fn candidates(path: &str) -> Vec<PathBuf> {
    let path = path.trim_end_matches('/');
    if path.is_empty() {
        return vec![PathBuf::from("index.html")];
    }
    let path = PathBuf::from_iter(path.split('/'));
    vec![
        path.join("index.html"),
        path.with_extension(match path.extension() {
            Some(extension) => extension.to_string_lossy().into_owned(),
            None => "html".to_owned(),
        }),
        path,
    ]
}

/// Check the internal links of `pages` (output path and HTML) against the files that are known to
/// exist in the output directory.
pub fn check(
    ctx: &Ctx,
    pages: &[(PathBuf, String)],
    known: &HashSet<PathBuf>,
) -> anyhow::Result<Vec<BrokenLink>> {
    let mut broken = Vec::new();

    for (page, html) in pages {
        if page.extension().is_some_and(|ext| ext != "html") {
            continue;
        }
        let page_route = ctx.path_to_route(page)?;

        for link in collect_links(html)? {
            let Some(path) = resolve(ctx.base_url(), &page_route, &link.href) else {
                continue;
            };
            if !candidates(&path).iter().any(|file| known.contains(file)) {
                broken.push(BrokenLink {
                    page: page.clone(),
                    kind: link.kind,
                    href: link.href,
                });
            }
        }
    }

    Ok(broken)
}

/// Report broken links. Broken image sources and `<link>` resources are warnings, broken anchors
/// follow `on_broken_links`.
pub fn report(broken: Vec<BrokenLink>, on_broken_links: ReportingSeverity) -> Result<(), LinkError> {
    let mut thrown = Vec::new();

    for link in broken {
        match link.kind {
            LinkKind::Image => {
                log::warn!(
                    "Image source {} on page {} does not exist",
                    link.href,
                    link.page.display()
                );
            }
            LinkKind::Resource => {
                log::warn!(
                    "Linked resource {} on page {} does not exist",
                    link.href,
                    link.page.display()
                );
            }
            LinkKind::Anchor => {
                if on_broken_links.report(format!(
                    "Broken link on page {}: {}",
                    link.page.display(),
                    link.href
                )) {
                    thrown.push(link);
                }
            }
        }
    }

    if thrown.is_empty() {
        Ok(())
    } else {
        Err(LinkError::Broken(thrown))
    }
}
