//! Markdown rendering for blog posts.

use anyhow::Context;
use std::{
    collections::HashMap,
    fmt::Write,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};

use crate::highlight::{self, Languages};

/// Everything before the truncate marker (`<!-- truncate -->`, with any whitespace inside the
/// comment) is the post's summary.
fn truncate_marker() -> &'static regex::Regex {
    static TRUNCATE_MARKER: OnceLock<regex::Regex> = OnceLock::new();
    TRUNCATE_MARKER.get_or_init(|| {
        regex::Regex::new(r"<!--\s*truncate\s*-->").expect("truncate marker pattern is valid")
    })
}

/// Resolves relative links to Markdown files into routes of the posts rendered from them.
pub struct MarkdownLinks<'a> {
    /// Directory of the file being rendered.
    pub source_dir: &'a Path,
    /// Canonicalized source file path to route.
    pub routes: &'a HashMap<PathBuf, String>,
    /// For posts that live in their own directory: the route files next to the post are served
    /// from.
    pub asset_route: Option<&'a str>,
}

fn is_relative(dest: &str) -> bool {
    !(dest.contains("://")
        || dest.starts_with(['/', '#'])
        || dest.starts_with("mailto:")
        || dest.starts_with("tel:"))
}

impl MarkdownLinks<'_> {
    /// Returns the rewritten destination and the source file if `dest` is a relative link to a file
    /// next to a post in its own directory.
    fn resolve_asset(&self, dest: &str) -> Option<(String, PathBuf)> {
        let asset_route = self.asset_route?;
        if !is_relative(dest) {
            return None;
        }
        let path = dest.split(['#', '?']).next().unwrap_or(dest);
        let path = path.strip_prefix("./").unwrap_or(path);
        if path.is_empty() || path.ends_with(".md") || path.split('/').any(|part| part == "..") {
            return None;
        }

        let source = self.source_dir.join(path);
        source.is_file().then(|| {
            let rest = &dest[dest.len() - dest.trim_start_matches("./").len()..];
            (format!("{asset_route}/{rest}"), PathBuf::from(path))
        })
    }

    /// Returns `None` if `dest` is not a link to a Markdown file, `Some(Err(()))` if it is but the
    /// file is not a known post.
    fn resolve(&self, dest: &str) -> Option<Result<String, ()>> {
        if !is_relative(dest) {
            return None;
        }

        let (path, fragment) = match dest.find('#') {
            Some(idx) => (&dest[..idx], &dest[idx..]),
            None => (dest, ""),
        };
        if !path.ends_with(".md") {
            return None;
        }

        let route = self
            .source_dir
            .join(path)
            .canonicalize()
            .ok()
            .and_then(|path| self.routes.get(&path));
        Some(match route {
            Some(route) => Ok(format!("{route}{fragment}")),
            None => Err(()),
        })
    }
}

#[derive(Debug)]
pub struct Rendered {
    pub summary: String,
    pub content: String,
    /// Whether the source contained the truncate marker.
    pub truncated: bool,
    pub words: usize,
    /// Link destinations to Markdown files that are not known posts.
    pub broken_links: Vec<String>,
    /// Files next to the post that it links to, relative to the post's directory.
    pub assets: Vec<PathBuf>,
}

fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS
        | Options::ENABLE_SMART_PUNCTUATION
        | Options::ENABLE_HEADING_ATTRIBUTES
}

fn push_code_block(html: &mut String, code: &str, info: &str, languages: &Languages) -> anyhow::Result<()> {
    let language = info.split_whitespace().next().unwrap_or("");
    match highlight::highlight(code, language, languages)
        .with_context(|| format!("Highlighting a {language:?} code block"))?
    {
        highlight::Highlighted::Plain(plaintext) => {
            write!(html, "<pre><code>{plaintext}</code></pre>\n")?;
        }
        highlight::Highlighted::Highlighted {
            language,
            highlighted,
        } => {
            write!(
                html,
                "<pre class=\"highlight\"><code data-lang=\"{language}\">{highlighted}</code></pre>\n"
            )?;
        }
    }

    Ok(())
}

struct Output {
    html: String,
    words: usize,
    broken_links: Vec<String>,
    assets: Vec<PathBuf>,
}

fn render_fragment(
    markdown: &str,
    languages: &Languages,
    links: &MarkdownLinks<'_>,
) -> anyhow::Result<Output> {
    let mut words = 0;
    let mut broken_links = Vec::new();
    let mut assets = Vec::new();
    let mut events: Vec<Event<'_>> = Vec::new();
    let mut code_block: Option<(CowStr<'_>, String)> = None;

    for event in Parser::new_ext(markdown, options()) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                let info = match kind {
                    CodeBlockKind::Indented => "".into(),
                    CodeBlockKind::Fenced(info) => info,
                };
                code_block = Some((info, String::new()));
            }
            Event::Text(text) if code_block.is_some() => {
                if let Some((_, code)) = code_block.as_mut() {
                    code.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((info, code)) = code_block.take() {
                    words += code.split_whitespace().count();
                    let mut html = String::new();
                    push_code_block(&mut html, &code, &info, languages)?;
                    events.push(Event::Html(html.into()));
                }
            }
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let dest_url = match links.resolve(&dest_url) {
                    Some(Ok(route)) => route.into(),
                    Some(Err(())) => {
                        broken_links.push(dest_url.to_string());
                        dest_url
                    }
                    None => match links.resolve_asset(&dest_url) {
                        Some((route, asset)) => {
                            assets.push(asset);
                            route.into()
                        }
                        None => dest_url,
                    },
                };
                events.push(Event::Start(Tag::Link {
                    link_type,
                    dest_url,
                    title,
                    id,
                }));
            }
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => {
                let dest_url = match links.resolve_asset(&dest_url) {
                    Some((route, asset)) => {
                        assets.push(asset);
                        route.into()
                    }
                    None => dest_url,
                };
                events.push(Event::Start(Tag::Image {
                    link_type,
                    dest_url,
                    title,
                    id,
                }));
            }
            Event::Text(text) => {
                words += text.split_whitespace().count();
                events.push(Event::Text(text));
            }
            event => events.push(event),
        }
    }

    let mut html = String::with_capacity(markdown.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut html, events.into_iter());

    assets.sort();
    assets.dedup();

    Ok(Output {
        html,
        words,
        broken_links,
        assets,
    })
}

/// Render a post's Markdown to HTML. The summary is the part before the truncate marker, or the
/// whole post if there is no marker.
pub fn render(
    markdown: &str,
    languages: &Languages,
    links: &MarkdownLinks<'_>,
) -> anyhow::Result<Rendered> {
    let content = render_fragment(markdown, languages, links)?;

    let (summary, truncated) = match truncate_marker().find(markdown) {
        Some(marker) => (
            render_fragment(&markdown[..marker.start()], languages, links)?.html,
            true,
        ),
        None => (content.html.clone(), false),
    };

    Ok(Rendered {
        summary,
        content: content.html,
        truncated,
        words: content.words,
        broken_links: content.broken_links,
        assets: content.assets,
    })
}

/// Minutes needed to read `words` words, at 200 words per minute. At least one minute.
pub fn reading_time(words: usize) -> u32 {
    (words.div_ceil(200)).max(1) as u32
}

#[cfg(test)]
mod test {
    use std::collections::HashMap;

    use super::{reading_time, render, MarkdownLinks};
    use crate::highlight::Languages;

    fn render_str(markdown: &str) -> super::Rendered {
        let routes = HashMap::new();
        let links = MarkdownLinks {
            source_dir: std::path::Path::new("."),
            routes: &routes,
            asset_route: None,
        };
        render(markdown, &Languages::new(&[]), &links).unwrap()
    }

    #[test]
    fn summary_before_truncate_marker() {
        let rendered = render_str("Intro paragraph.\n\n<!-- truncate -->\n\nThe rest.\n");

        assert!(rendered.truncated);
        assert_eq!(rendered.summary, "<p>Intro paragraph.</p>\n");
        assert!(rendered.content.contains("<p>The rest.</p>"));
        assert_eq!(rendered.words, 4);
    }

    #[test]
    fn truncate_marker_whitespace() {
        for marker in ["<!--truncate-->", "<!--  truncate\t-->", "<!--\ntruncate\n-->"] {
            let rendered = render_str(&format!("Intro.\n\n{marker}\n\nThe rest.\n"));

            assert!(rendered.truncated, "{marker:?} not recognized");
            assert_eq!(rendered.summary, "<p>Intro.</p>\n");
        }

        assert!(!render_str("<!-- truncated -->\n\nText.\n").truncated);
    }

    #[test]
    fn untruncated_post() {
        let rendered = render_str("Only *one* paragraph.");

        assert!(!rendered.truncated);
        assert_eq!(rendered.summary, rendered.content);
        assert_eq!(rendered.content, "<p>Only <em>one</em> paragraph.</p>\n");
    }

    #[test]
    fn code_blocks() {
        let rendered = render_str("```rust\nfn main() {}\n```\n\n```powershell\nGet-Item <x>\n```\n");

        assert!(rendered
            .content
            .contains("<pre class=\"highlight\"><code data-lang=\"rust\">"));
        assert!(rendered
            .content
            .contains("<pre><code>Get-Item &lt;x&gt;\n</code></pre>"));
    }

    #[test]
    fn markdown_links() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2024-01-01_a.md"), "").unwrap();
        let routes = HashMap::from([(
            dir.path().join("2024-01-01_a.md").canonicalize().unwrap(),
            "/blog/2024/01/01/a".to_owned(),
        )]);
        let links = MarkdownLinks {
            source_dir: dir.path(),
            routes: &routes,
            asset_route: None,
        };

        let rendered = render(
            "[a](./2024-01-01_a.md#part) [b](missing.md) [c](https://example.com/x.md) [d](/blog)",
            &Languages::new(&[]),
            &links,
        )
        .unwrap();

        assert!(rendered.content.contains(r#"<a href="/blog/2024/01/01/a#part">a</a>"#));
        assert!(rendered.content.contains(r#"<a href="missing.md">b</a>"#));
        assert_eq!(rendered.broken_links, ["missing.md"]);
    }

    #[test]
    fn assets_next_to_post() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("schema.png"), "").unwrap();
        std::fs::write(dir.path().join("notes.pdf"), "").unwrap();
        let routes = HashMap::new();
        let links = MarkdownLinks {
            source_dir: dir.path(),
            routes: &routes,
            asset_route: Some("/blog/2024/03/01/new"),
        };

        let rendered = render(
            "![schéma](./schema.png) [notes](notes.pdf#page=2) ![ailleurs](missing.png)",
            &Languages::new(&[]),
            &links,
        )
        .unwrap();

        assert!(rendered
            .content
            .contains(r#"<img src="/blog/2024/03/01/new/schema.png" alt="schéma" />"#));
        assert!(rendered
            .content
            .contains(r#"<a href="/blog/2024/03/01/new/notes.pdf#page=2">notes</a>"#));
        assert!(rendered.content.contains(r#"<img src="missing.png""#));
        assert_eq!(
            rendered.assets,
            [
                std::path::PathBuf::from("notes.pdf"),
                std::path::PathBuf::from("schema.png")
            ]
        );
    }

    #[test]
    fn reading_time_rounds_up() {
        assert_eq!(reading_time(0), 1);
        assert_eq!(reading_time(200), 1);
        assert_eq!(reading_time(201), 2);
        assert_eq!(reading_time(1000), 5);
    }
}
