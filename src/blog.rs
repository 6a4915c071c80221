//! Blog post collection and rendering.

use anyhow::Context;
use rayon::prelude::*;
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::{Path, PathBuf},
};

use crate::{
    config::{ReportingSeverity, SiteConfig},
    front_matter::{self, AuthorRef, FrontMatter},
    markdown::{self, MarkdownLinks},
    types::{self, Author, Post, PostMeta, Tag},
    utils, Ctx,
};

/// Problems found in blog posts that are configured to fail the build.
#[derive(thiserror::Error, Debug)]
#[error("{} blog problem(s) configured to fail the build:\n{}", .problems.len(), .problems.join("\n"))]
pub struct PolicyError {
    pub problems: Vec<String>,
}

/// How to report each kind of problem found in blog posts.
#[derive(Clone, Copy, Debug)]
pub struct Policies {
    pub inline_tags: ReportingSeverity,
    pub inline_authors: ReportingSeverity,
    pub untruncated: ReportingSeverity,
    pub markdown_links: ReportingSeverity,
}

impl Policies {
    pub fn from_site_config(site_config: &SiteConfig) -> Self {
        Policies {
            inline_tags: site_config.blog.on_inline_tags,
            inline_authors: site_config.blog.on_inline_authors,
            untruncated: site_config.blog.on_untruncated_blog_posts,
            markdown_links: site_config.on_broken_markdown_links,
        }
    }
}

/// Collects problems, failing at the end if any was reported with `ReportingSeverity::Throw`.
#[derive(Default)]
struct Problems {
    thrown: Vec<String>,
}

impl Problems {
    fn report(&mut self, severity: ReportingSeverity, message: String) {
        if severity.report(&message) {
            self.thrown.push(message);
        }
    }

    fn finish(self) -> Result<(), PolicyError> {
        if self.thrown.is_empty() {
            Ok(())
        } else {
            Err(PolicyError {
                problems: self.thrown,
            })
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TagInfo {
    pub label: Option<String>,
    pub description: Option<String>,
}

/// Authors and tags declared in `authors.toml` and `tags.toml` in the blog directory.
#[derive(Debug, Default)]
pub struct Predefined {
    pub authors: HashMap<String, Author>,
    pub tags: HashMap<String, TagInfo>,
}

fn read_toml_table<T: serde::de::DeserializeOwned>(
    path: &Path,
) -> anyhow::Result<HashMap<String, T>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Parsing {}", path.display()))
}

impl Predefined {
    pub fn load(blog_dir: &Path) -> anyhow::Result<Self> {
        Ok(Predefined {
            authors: read_toml_table(&blog_dir.join("authors.toml"))?,
            tags: read_toml_table(&blog_dir.join("tags.toml"))?,
        })
    }
}

/// A post's source after front matter parsing, before its Markdown is rendered.
#[derive(Debug)]
pub struct Source {
    pub meta: PostMeta,
    pub front_matter: FrontMatter,
    pub markdown: String,
}

fn collect_files(blog_dir: &Path) -> impl Iterator<Item = anyhow::Result<PathBuf>> + '_ {
    walkdir::WalkDir::new(blog_dir)
        .min_depth(1)
        .max_depth(2)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_map(move |entry| match entry {
            Ok(entry) => {
                let path = entry.path();
                let is_post = entry.file_type().is_file()
                    && path.extension().is_some_and(|ext| ext == "md")
                    && (entry.depth() == 1 || path.ends_with("index.md"));
                is_post.then(|| Ok(path.to_owned()))
            }
            Err(err) => Some(Err(err.into())),
        })
}

/// Collect the posts in `blog_dir`, newest first. Drafts are left out of production builds.
pub fn collect_posts(ctx: &Ctx, blog_dir: &Path, blog_route: &Path) -> anyhow::Result<Vec<Source>> {
    if !blog_dir.exists() {
        log::info!("No blog directory at {}", blog_dir.display());
        return Ok(Vec::new());
    }

    let mut sources = Vec::new();
    for path in collect_files(blog_dir) {
        let path = path?;
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Reading {}", path.display()))?;
        let (front_matter, markdown) = front_matter::parse_front_matter(&content)
            .with_context(|| format!("Parsing front matter of {}", path.display()))?;
        let meta = PostMeta::from_path(ctx, blog_dir, blog_route, &path, &front_matter)
            .with_context(|| format!("Blog post {}", path.display()))?;
        let markdown = markdown.to_owned();

        sources.push(Source {
            meta,
            front_matter,
            markdown,
        });
    }

    if ctx.build_kind().is_production() {
        let before = sources.len();
        sources.retain(|source| !source.front_matter.draft);
        let after = sources.len();
        if before != after {
            log::info!("Filtered out {} draft post(s)", before - after);
        }
    }

    sources.sort_by(|a, b| {
        (b.meta.date, b.meta.time)
            .cmp(&(a.meta.date, a.meta.time))
            .then_with(|| a.meta.sort_key.cmp(&b.meta.sort_key))
    });

    let mut routes = HashSet::new();
    for source in &sources {
        if !routes.insert(&source.meta.route) {
            anyhow::bail!("Blog post permalink is duplicated: {}", source.meta.route);
        }
    }

    Ok(sources)
}

fn tag(ctx: &Ctx, blog_route: &Path, key: &str, info: Option<&TagInfo>) -> anyhow::Result<Tag> {
    let slug = utils::slugify(key);
    if slug.is_empty() {
        anyhow::bail!("tag {key:?} has no characters usable in a URL");
    }
    let route = ctx.path_to_route(blog_route.join("tags").join(&slug).join("index.html"))?;

    Ok(Tag {
        label: info
            .and_then(|info| info.label.clone())
            .unwrap_or_else(|| key.to_owned()),
        description: info.and_then(|info| info.description.clone()),
        slug,
        route,
    })
}

/// Render all posts' Markdown and resolve their authors and tags. Problems are reported according
/// to `policies`.
pub fn render_posts(
    ctx: &Ctx,
    blog_route: &Path,
    sources: Vec<Source>,
    predefined: &Predefined,
    policies: Policies,
) -> anyhow::Result<Vec<Post>> {
    // Canonicalized source file path => route, for rewriting links between posts
    let routes: HashMap<PathBuf, String> = sources
        .iter()
        .filter_map(|source| {
            let path = source.meta.file_path.canonicalize().ok()?;
            Some((path, source.meta.route.clone()))
        })
        .collect();

    let rendered: Vec<markdown::Rendered> = sources
        .par_iter()
        .map(|source| {
            let source_dir = source
                .meta
                .file_path
                .parent()
                .unwrap_or_else(|| Path::new("."));
            let links = MarkdownLinks {
                source_dir,
                routes: &routes,
                asset_route: source
                    .meta
                    .file_path
                    .ends_with("index.md")
                    .then_some(source.meta.route.as_str()),
            };
            markdown::render(&source.markdown, ctx.languages(), &links)
                .with_context(|| format!("Rendering {}", source.meta.file_path.display()))
        })
        .collect::<anyhow::Result<_>>()?;

    let mut problems = Problems::default();
    let mut posts = Vec::with_capacity(sources.len());

    for (source, rendered) in sources.into_iter().zip(rendered) {
        let file = source.meta.file_path.display().to_string();

        for link in &rendered.broken_links {
            problems.report(
                policies.markdown_links,
                format!("Broken markdown link in {file}: {link}"),
            );
        }
        if !rendered.truncated {
            problems.report(
                policies.untruncated,
                format!("Blog post {file} has no <!-- truncate --> marker"),
            );
        }

        let mut authors = Vec::with_capacity(source.front_matter.authors.len());
        for author in &source.front_matter.authors {
            match author {
                AuthorRef::Key(key) => match predefined.authors.get(key) {
                    Some(author) => authors.push(author.clone()),
                    None => anyhow::bail!("Blog post {file} refers to unknown author {key:?}"),
                },
                AuthorRef::Inline(author) => {
                    problems.report(
                        policies.inline_authors,
                        format!("Blog post {file} declares author {:?} inline", author.name),
                    );
                    authors.push(author.clone());
                }
            }
        }

        let mut tags = Vec::with_capacity(source.front_matter.tags.len());
        for key in &source.front_matter.tags {
            let info = predefined.tags.get(key);
            if info.is_none() {
                problems.report(
                    policies.inline_tags,
                    format!("Blog post {file} uses tag {key:?} that is not declared in tags.toml"),
                );
            }
            tags.push(tag(ctx, blog_route, key, info)?);
        }

        let date_time = types::to_date_time(source.meta.date, source.meta.time)
            .ok_or(anyhow::anyhow!("Blog post {file} has an invalid date"))?
            .and_utc();
        let title = source
            .front_matter
            .title
            .clone()
            .unwrap_or_else(|| source.meta.slug.clone());

        posts.push(Post {
            title,
            description: source.front_matter.description,
            authors,
            tags,
            summary: rendered.summary,
            content: rendered.content,
            truncated: rendered.truncated,
            reading_time: markdown::reading_time(rendered.words),
            date_rfc2822: date_time.to_rfc2822(),
            date_rfc3339: date_time.to_rfc3339(),
            assets: rendered.assets,
            meta: source.meta,
        });
    }

    problems.finish()?;
    Ok(posts)
}

/// The posts carrying one tag.
#[derive(Debug, serde::Serialize)]
pub struct TagPosts<'p> {
    pub tag: &'p Tag,
    pub posts: Vec<&'p Post>,
}

/// Group posts by tag slug, keeping the post order. Tags are ordered by slug.
pub fn posts_by_tag(posts: &[Post]) -> Vec<TagPosts<'_>> {
    let mut by_tag: BTreeMap<&str, TagPosts<'_>> = BTreeMap::new();
    for post in posts {
        for tag in &post.tags {
            by_tag
                .entry(tag.slug.as_str())
                .or_insert_with(|| TagPosts {
                    tag,
                    posts: Vec::new(),
                })
                .posts
                .push(post);
        }
    }
    by_tag.into_values().collect()
}
