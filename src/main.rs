use anyhow::Context;
use chrono::Datelike;
use clap::Parser;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use notify_debouncer_full::{
    new_debouncer,
    notify::{RecursiveMode, Watcher},
    DebounceEventResult,
};

mod blog;
mod cli;
mod config;
mod ctx;
mod front_matter;
mod highlight;
mod home;
mod links;
mod markdown;
mod out;
mod page;
mod palette;
mod render;
mod theme;
mod types;
mod utils;

#[cfg(test)]
mod tests;

use ctx::Ctx;
use out::Out;

/// A unit of rendering work in `render_pages`.
enum RenderJob<'a> {
    Post(&'a types::Post),
    Tag(&'a blog::TagPosts<'a>),
    Feed(config::FeedType),
    /// A template where no part of the template path starts with an underscore. It renders to one
    /// or more pages of its own.
    Template(&'a str),
}

impl RenderJob<'_> {
    fn render(
        &self,
        render_context: &render::RenderCtx<'_>,
    ) -> anyhow::Result<Vec<(PathBuf, String)>> {
        match *self {
            RenderJob::Post(post) => {
                let mut write = Vec::new();
                render_context
                    .post(&mut write, post)
                    .with_context(|| format!("Rendering {}", post.meta.file_path.display()))?;
                Ok(vec![(post.meta.out_file.clone(), String::from_utf8(write)?)])
            }
            RenderJob::Tag(tag_posts) => {
                let out_file = PathBuf::from("blog")
                    .join("tags")
                    .join(&tag_posts.tag.slug)
                    .join("index.html");
                let mut write = Vec::new();
                render_context
                    .tag(&mut write, tag_posts)
                    .with_context(|| format!("Rendering tag page {}", tag_posts.tag.label))?;
                Ok(vec![(out_file, String::from_utf8(write)?)])
            }
            RenderJob::Feed(feed_type) => {
                let out_file = PathBuf::from("blog").join(match feed_type {
                    config::FeedType::Rss => "rss.xml",
                    config::FeedType::Atom => "atom.xml",
                });
                let mut write = Vec::new();
                render_context
                    .feed(&mut write, feed_type)
                    .with_context(|| format!("Rendering {}", out_file.display()))?;
                Ok(vec![(out_file, String::from_utf8(write)?)])
            }
            RenderJob::Template(template_path) => render_context
                .template(template_path)?
                .map(|page| page.with_context(|| format!("Rendering template {template_path}")))
                .collect(),
        }
    }
}

/// Render everything that is generated from templates: posts, tag pages, feeds and the page
/// templates, in parallel on the rayon pool. Pages are returned in no particular order.
fn render_pages(
    render_context: render::RenderCtx<'_>,
    posts: &[types::Post],
    tags: &[blog::TagPosts<'_>],
    feed_types: &[config::FeedType],
    page_templates: &[String],
) -> anyhow::Result<Vec<(PathBuf, String)>> {
    let jobs: Vec<RenderJob<'_>> = posts
        .iter()
        .map(RenderJob::Post)
        .chain(tags.iter().map(RenderJob::Tag))
        .chain(feed_types.iter().copied().map(RenderJob::Feed))
        .chain(page_templates.iter().map(|name| RenderJob::Template(name)))
        .collect();

    let rendered = jobs
        .par_iter()
        .map(|job| job.render(&render_context))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(rendered.into_iter().flatten().collect())
}

fn build(
    site_dir: &Path,
    out_dir: &Path,
    site_config: &config::SiteConfig,
    ctx: &Ctx,
    renderer: &render::Renderer,
) -> anyhow::Result<()> {
    let out = Out::at(out_dir)?;

    {
        let static_dir = site_dir.join("static");
        if static_dir.exists() {
            out.copy_dir(&static_dir, ".")?;
        }
    }

    for (out_file, content) in theme::ASSETS {
        out.update_file(&mut content.as_bytes(), out_file)?;
    }

    {
        let light = palette::Palette::by_name(&site_config.prism.theme)
            .ok_or(anyhow::anyhow!("unknown palette {}", site_config.prism.theme))?;
        let dark = palette::Palette::by_name(&site_config.prism.dark_theme)
            .ok_or(anyhow::anyhow!("unknown palette {}", site_config.prism.dark_theme))?;
        out.update_file(
            &mut palette::stylesheet(light, dark).as_bytes(),
            Path::new("assets").join("css").join("highlight.css"),
        )?;
    }

    if let Some(custom_css) = &site_config.theme.custom_css {
        let custom_css = site_dir.join(custom_css);
        out.copy_file(
            &custom_css,
            Path::new("assets").join("css").join("custom.css"),
        )
        .with_context(|| format!("Copying custom CSS {}", custom_css.display()))?;
    }

    let blog_dir = site_dir.join(&site_config.blog.path);
    let blog_route = Path::new("blog");

    let sources = blog::collect_posts(ctx, &blog_dir, blog_route)?;
    log::info!("Found {} blog post(s)", sources.len());

    let predefined = blog::Predefined::load(&blog_dir)?;
    let posts = blog::render_posts(
        ctx,
        blog_route,
        sources,
        &predefined,
        blog::Policies::from_site_config(site_config),
    )?;
    let tags = blog::posts_by_tag(&posts);
    log::debug!("Found {} tag(s)", tags.len());

    for post in &posts {
        let (Some(source_dir), Some(out_dir)) =
            (post.meta.file_path.parent(), post.meta.out_file.parent())
        else {
            continue;
        };
        for asset in &post.assets {
            out.copy_file(source_dir.join(asset), out_dir.join(asset))?;
        }
    }

    if site_config.blog.feed_xslt {
        for feed_type in &site_config.blog.feed_types {
            let (xsl, out_file) = match feed_type {
                config::FeedType::Rss => (theme::RSS_XSL, "rss.xsl"),
                config::FeedType::Atom => (theme::ATOM_XSL, "atom.xsl"),
            };
            out.update_file(&mut xsl.as_bytes(), blog_route.join(out_file))?;
        }
    }

    let render_context = renderer.render_context(&posts, &tags);

    let mut pages = {
        let mut write = Vec::new();
        render_context
            .home(&mut write, &home::compose())
            .context("Rendering the home page")?;
        vec![(PathBuf::from("index.html"), String::from_utf8(write)?)]
    };
    pages.extend(render_pages(
        render_context,
        &posts,
        &tags,
        &site_config.blog.feed_types,
        &renderer.page_templates()?,
    )?);
    pages.sort_by(|(a, _), (b, _)| a.cmp(b));

    {
        let known: HashSet<PathBuf> = out
            .written()
            .into_iter()
            .chain(pages.iter().map(|(path, _)| path.clone()))
            .collect();
        let broken = links::check(ctx, &pages, &known)?;
        links::report(broken, site_config.on_broken_links)?;
    }

    for (out_file, content) in &pages {
        out.update_file(&mut content.as_bytes(), out_file)?;
    }
    log::info!(
        "Wrote {} page(s), {} file(s) in total, to {}",
        pages.len(),
        out.written().len(),
        out.prefix().display()
    );

    Ok(())
}

/// Everything a build needs that is derived from `site.toml` and the templates.
struct Site {
    site_config: config::SiteConfig,
    ctx: Ctx,
    renderer: render::Renderer,
}

impl Site {
    fn load(
        site_dir: &Path,
        build_kind: cli::BuildKind,
        site_config: config::SiteConfig,
    ) -> anyhow::Result<Self> {
        let year = chrono::Local::now().year();
        let ctx = Ctx::from_site_config(build_kind, &site_config, year);
        let renderer =
            render::Renderer::build(&ctx, &site_config, Some(site_dir.join("templates")))?;

        Ok(Site {
            site_config,
            ctx,
            renderer,
        })
    }

    fn build(&self, site_dir: &Path, out_dir: &Path) -> anyhow::Result<()> {
        build(
            site_dir,
            out_dir,
            &self.site_config,
            &self.ctx,
            &self.renderer,
        )
    }
}

enum FsChange {
    Template,
    Other,
    None,
}

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();

    let cli::Commands::Build(args) = args.command;
    let build_kind = args.build_kind();

    {
        use simplelog as s;
        s::TermLogger::init(
            if args.verbose {
                s::LevelFilter::Debug
            } else {
                s::LevelFilter::Info
            },
            s::Config::default(),
            s::TerminalMode::Mixed,
            s::ColorChoice::Auto,
        )?;
    }

    let site_config_path = args.path.join("site.toml");

    if args.watch {
        let cvar_pair = Arc::new((Mutex::new(FsChange::Template), Condvar::new()));
        let cvar_pair2 = cvar_pair.clone();
        let path_prefix = args.path.canonicalize()?;
        let out_prefix = std::path::absolute(&args.out)?;
        let mut debouncer = new_debouncer(
            Duration::from_millis(250),
            None,
            move |ev: DebounceEventResult| {
                let (lock, cvar) = &*cvar_pair2;
                let mut change_ = FsChange::Other;

                if let Ok(evs) = ev {
                    let paths: Vec<PathBuf> = evs
                        .into_iter()
                        .flat_map(|e| e.event.paths.into_iter())
                        .filter(|path| !path.starts_with(&out_prefix))
                        .collect();
                    if paths.is_empty() {
                        return;
                    }
                    if paths.iter().any(|path| {
                        path.strip_prefix(&path_prefix)
                            .map(|path| path.starts_with("templates"))
                            .unwrap_or(false)
                    }) {
                        change_ = FsChange::Template;
                    }
                }

                let mut change = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                if !matches!(*change, FsChange::Template) {
                    *change = change_;
                }
                cvar.notify_one();
            },
        )?;

        debouncer
            .watcher()
            .watch(&args.path, RecursiveMode::Recursive)?;
        debouncer
            .cache()
            .add_root(&args.path, RecursiveMode::Recursive);

        let mut site: Option<Site> = None;

        let mut build_watch = move |change: FsChange| -> anyhow::Result<()> {
            let site_config = config::SiteConfig::load(&site_config_path)?;

            let config_changed = site.as_ref().map(|site| &site.site_config) != Some(&site_config);
            if config_changed && site.is_some() {
                log::info!("Reloaded site.toml.");
            }

            let site = match site.take() {
                Some(loaded) if !config_changed && !matches!(change, FsChange::Template) => {
                    site.insert(loaded)
                }
                _ => {
                    log::info!("Reloading templates…");
                    site.insert(Site::load(&args.path, build_kind, site_config)?)
                }
            };

            log::info!("Building…");
            let instant = std::time::Instant::now();
            if let Err(err) = site.build(&args.path, &args.out) {
                log::error!("{:?}", err);
            }
            log::info!(
                "======== Building took {}ms ========",
                std::time::Instant::now()
                    .duration_since(instant)
                    .as_millis()
            );

            Ok(())
        };

        loop {
            let (lock, cvar) = &*cvar_pair;
            let mut change = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            while matches!(&*change, &FsChange::None) {
                log::info!("Waiting for file change…");
                change = cvar
                    .wait(change)
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
            }
            let change_ = std::mem::replace(&mut *change, FsChange::None);
            drop(change);

            if let Err(err) = build_watch(change_) {
                log::error!("{:?}", err);
            }
        }
    } else {
        let site_config = config::SiteConfig::load(&site_config_path)?;
        log::info!("Loaded {}", site_config_path.display());

        let instant = std::time::Instant::now();
        Site::load(&args.path, build_kind, site_config)?.build(&args.path, &args.out)?;
        log::info!(
            "Building took {}ms",
            std::time::Instant::now()
                .duration_since(instant)
                .as_millis()
        );
    }

    Ok(())
}
