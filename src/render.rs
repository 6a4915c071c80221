use anyhow::anyhow;
use minijinja::{context, value::ViaDeserialize, Environment};
use std::{
    cell::RefCell,
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use crate::blog::TagPosts;
use crate::config::{FeedType, SiteConfig};
use crate::page::Page;
use crate::theme;
use crate::types::Post;
use crate::Ctx;

thread_local! {
    // There is one Renderer instance for rendering, which has a `minijinja::Environment` where a
    // `paginate` function is defined. Rendering happens on multiple threads, so we define thread
    // local `Paginator` instances here. Once rendering of a template is complete, if the template
    // called out to `paginate`, PAGINATOR becomes set. The renderer then knows it needs to
    // paginate. When rendering the template is finished, `PAGINATOR` is unset.
    static PAGINATOR: RefCell<Option<Paginator>> = const { RefCell::new(None) };
    static PAGE_OUT_FILE: RefCell<Option<Box<dyn Fn(u32) -> PathBuf>>> = const { RefCell::new(None) };
}

struct Paginator {
    item_count: usize,
    per_page: u32,
    current_page: u32,
    last_page: u32,
    page_routes: Vec<String>,
}

impl Paginator {
    fn new(ctx: &Ctx, per_page: u32, item_count: usize) -> Result<Self, minijinja::Error> {
        if per_page == 0 {
            return Err(minijinja::Error::new(
                minijinja::ErrorKind::InvalidOperation,
                "`per_page` must be larger than zero",
            ));
        }

        PAGE_OUT_FILE.with_borrow(|page_out_file| {
            let page_out_file = page_out_file.as_ref().ok_or(minijinja::Error::new(
                minijinja::ErrorKind::InvalidOperation,
                "`paginate` can only be called from page templates",
            ))?;

            let last_page = (item_count.saturating_sub(1) / per_page as usize) as u32;
            let page_routes = (0u32..=last_page)
                .map(|page| {
                    ctx.path_to_route((*page_out_file)(page)).map_err(|err| {
                        minijinja::Error::new(
                            minijinja::ErrorKind::InvalidOperation,
                            err.to_string(),
                        )
                    })
                })
                .collect::<Result<_, _>>()?;

            Ok(Paginator {
                item_count,
                per_page,
                current_page: 0,
                last_page,
                page_routes,
            })
        })
    }

    /// Increase the paginator by a page. Returns whether we are expecting another page.
    fn paginate(&mut self) -> bool {
        self.current_page += 1;
        self.current_page <= self.last_page
    }
}

fn pagination_reset() {
    PAGINATOR.with_borrow_mut(|pagination| pagination.take());
    PAGE_OUT_FILE.with_borrow_mut(|page_out_file| page_out_file.take());
}

/// Template pagination function that can be added to a `minijinja::Environment`. This takes the
/// total number of items (either as a sequence or as a number) and the number of items to be
/// displayed per page.
///
/// The first call per template render sets up the paginator. Subsequent calls ignore the arguments
/// and return the same result.
fn gen_paginate(
    ctx: Ctx,
) -> impl Fn(&minijinja::Value, u32) -> Result<minijinja::Value, minijinja::Error> {
    move |items, per_page| {
        PAGINATOR.with_borrow_mut(|paginator| {
            if paginator.is_none() {
                let item_count = if items.is_number() {
                    usize::try_from(items.clone()).ok()
                } else if let Some(seq) = items.as_seq() {
                    Some(seq.item_count())
                } else {
                    None
                };
                let item_count = item_count.ok_or(minijinja::Error::new(
                    minijinja::ErrorKind::InvalidOperation,
                    "`items` argument is neither a number nor a sequence",
                ))?;

                *paginator = Some(Paginator::new(&ctx, per_page, item_count)?);
            }
            let paginator = paginator.as_ref().ok_or(minijinja::Error::new(
                minijinja::ErrorKind::InvalidOperation,
                "paginator is not set up",
            ))?;

            let page_start = paginator.current_page as usize * paginator.per_page as usize;
            let page_end = (page_start + paginator.per_page as usize).min(paginator.item_count);

            let is_first_page = paginator.current_page == 0;
            let is_last_page = paginator.current_page == paginator.last_page;

            Ok(minijinja::context! {
                item_count => paginator.item_count,
                page_count => paginator.last_page + 1,
                current_page => paginator.current_page,
                indices => (page_start..page_end).collect::<Vec<_>>(),
                is_first_page => is_first_page,
                is_last_page => is_last_page,
                previous => if is_first_page {
                    None
                } else {
                    Some(paginator.page_routes[(paginator.current_page - 1) as usize].clone())
                },
                next => if is_last_page {
                    None
                } else {
                    Some(paginator.page_routes[(paginator.current_page + 1) as usize].clone())
                },
                page_routes => paginator.page_routes,
            })
        })
    }
}

/// Where page `page` (zero-based) of a page template is written. Later pages of `index` templates
/// go to `page/<n>/index.html` next to the first page, others get the page number appended to their
/// file name.
pub fn page_out_file(template_path: &Path, page: u32) -> PathBuf {
    if page == 0 {
        return template_path.to_owned();
    }
    let page = page + 1;

    let file_stem = template_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = template_path
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    if file_stem == "index" {
        template_path
            .with_file_name("page")
            .join(page.to_string())
            .join(format!("index{extension}"))
    } else {
        template_path.with_file_name(format!("{file_stem}-{page}{extension}"))
    }
}

/// Minijinja filter to add leading zeros to a numeric value.
fn leading_zeros(val: minijinja::Value, leading_zeros: u8) -> Result<String, minijinja::Error> {
    let num: i64 = val.try_into()?;
    let length = if num == 0 { 1 } else { num.ilog10() + 1 };
    let zeros = "0".repeat(leading_zeros.saturating_sub(length as u8) as usize);

    Ok(format!("{zeros}{num}"))
}

pub struct Renderer {
    ctx: Ctx,
    site_config: SiteConfig,
    copyright: Option<String>,
    template_path: Option<PathBuf>,
    t: Environment<'static>,
}

#[derive(Clone, Copy, serde::Serialize)]
struct TemplateCtx<'ctx> {
    base_url: &'ctx str,
    site_url: &'ctx str,
    year: i32,
    lang: &'ctx str,
    site: &'ctx SiteConfig,
    copyright: Option<&'ctx str>,
    posts: &'ctx [Post],
    tags: &'ctx [TagPosts<'ctx>],
}

#[derive(Clone, Copy)]
pub struct RenderCtx<'ctx> {
    renderer: &'ctx Renderer,
    ctx: TemplateCtx<'ctx>,
}

/// Escapes like the default formatter, except that slashes are left alone so URLs in attributes
/// come out as written.
fn html_formatter(
    out: &mut minijinja::Output<'_>,
    state: &minijinja::State<'_, '_>,
    value: &minijinja::Value,
) -> Result<(), minijinja::Error> {
    if let (minijinja::AutoEscape::Html, Some(s), false) =
        (state.auto_escape(), value.as_str(), value.is_safe())
    {
        let mut escaped = String::with_capacity(s.len());
        let _ = pulldown_cmark_escape::escape_html(&mut escaped, s);
        return out.write_str(&escaped).map_err(|_| {
            minijinja::Error::new(minijinja::ErrorKind::WriteFailure, "could not write output")
        });
    }
    minijinja::escape_formatter(out, state, value)
}

fn to_minijinja_error(err: anyhow::Error) -> minijinja::Error {
    minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, err.to_string())
}

impl Renderer {
    /// Set up the template environment. Templates in `template_path`, if given, take precedence
    /// over the built-in theme.
    pub fn build(
        ctx: &Ctx,
        site_config: &SiteConfig,
        template_path: Option<PathBuf>,
    ) -> anyhow::Result<Renderer> {
        let mut t = Environment::new();
        t.set_undefined_behavior(minijinja::UndefinedBehavior::Chainable);
        t.set_formatter(html_formatter);

        t.add_function("paginate", gen_paginate(ctx.clone()));
        t.add_filter("leading_zeros", leading_zeros);

        {
            let ctx = ctx.clone();
            t.add_filter(
                "path_to_url",
                move |path: ViaDeserialize<PathBuf>| -> Result<String, minijinja::Error> {
                    ctx.path_to_absolute_url(&*path).map_err(to_minijinja_error)
                },
            );
        }
        {
            let ctx = ctx.clone();
            t.add_filter(
                "route",
                move |path: ViaDeserialize<PathBuf>| -> Result<String, minijinja::Error> {
                    ctx.path_to_route(&*path).map_err(to_minijinja_error)
                },
            );
        }
        {
            let ctx = ctx.clone();
            t.add_filter("internal_url", move |to: String| -> String {
                ctx.internal_url(&to)
            });
        }

        let site_loader = template_path.clone().map(minijinja::path_loader);
        t.set_loader(move |name| {
            if let Some(site_loader) = &site_loader {
                if let Some(template) = site_loader(name)? {
                    return Ok(Some(template));
                }
            }
            Ok(theme::template(name).map(str::to_owned))
        });

        Ok(Renderer {
            ctx: ctx.clone(),
            site_config: site_config.clone(),
            copyright: site_config.copyright(ctx.year()),
            template_path,
            t,
        })
    }

    /// Names of the templates rendered as pages of their own: all templates where no part of the
    /// template path starts with an underscore.
    pub fn page_templates(&self) -> anyhow::Result<Vec<String>> {
        let mut names: BTreeSet<String> = theme::page_templates().map(str::to_owned).collect();

        if let Some(path) = self.template_path.as_ref().filter(|path| path.exists()) {
            for template_path in walkdir::WalkDir::new(path).follow_links(true) {
                let template_path = template_path?;
                if !template_path.file_type().is_file() {
                    continue;
                }
                let template_path = template_path.path().strip_prefix(path)?;
                if template_path
                    .iter()
                    .any(|p| p.to_string_lossy().starts_with('_'))
                {
                    continue;
                }
                let name = crate::utils::path_to_url(None, template_path)?;
                names.insert(name);
            }
        }

        Ok(names.into_iter().collect())
    }

    pub fn render_context<'ctx>(
        &'ctx self,
        posts: &'ctx [Post],
        tags: &'ctx [TagPosts<'ctx>],
    ) -> RenderCtx<'ctx> {
        RenderCtx {
            renderer: self,
            ctx: TemplateCtx {
                base_url: self.ctx.base_url(),
                site_url: self.ctx.site_url(),
                year: self.ctx.year(),
                lang: self.site_config.locale(),
                site: &self.site_config,
                copyright: self.copyright.as_deref(),
                posts,
                tags,
            },
        }
    }
}

impl RenderCtx<'_> {
    fn render_named(
        &self,
        write: impl std::io::Write,
        name: &str,
        ctx: minijinja::Value,
    ) -> anyhow::Result<()> {
        let template = self.renderer.t.get_template(name)?;
        template.render_to_write(
            context! {
                ..ctx, ..minijinja::Value::from_serialize(self.ctx)
            },
            write,
        )?;

        Ok(())
    }

    /// Render the home page. Every section goes through `_sections/<kind>.html`.
    pub fn home(&self, write: impl std::io::Write, page: &Page) -> anyhow::Result<()> {
        self.render_named(write, "_home.html", context! { page => page })
    }

    pub fn post(&self, write: impl std::io::Write, post: &Post) -> anyhow::Result<()> {
        self.render_named(write, "_post.html", context! { post => post })
    }

    pub fn tag(&self, write: impl std::io::Write, tag_posts: &TagPosts<'_>) -> anyhow::Result<()> {
        self.render_named(
            write,
            "_tag.html",
            context! { tag => tag_posts.tag, tag_posts => tag_posts.posts },
        )
    }

    pub fn feed(&self, write: impl std::io::Write, feed_type: FeedType) -> anyhow::Result<()> {
        let name = match feed_type {
            FeedType::Rss => "_feeds/rss.xml",
            FeedType::Atom => "_feeds/atom.xml",
        };
        self.render_named(write, name, context! {})
    }

    /// Render a page template. Returns the rendered pages by page number; templates that do not
    /// call `paginate` render to a single page.
    pub fn template(
        &self,
        template_path: impl AsRef<Path>,
    ) -> anyhow::Result<impl Iterator<Item = anyhow::Result<(PathBuf, String)>>> {
        let template_path = template_path.as_ref().to_owned();
        let name = template_path
            .to_str()
            .ok_or(anyhow!("template path is not Unicode: {:?}", template_path))?
            .to_owned();

        {
            let template_path = template_path.clone();
            PAGE_OUT_FILE.set(Some(Box::new(move |page| {
                page_out_file(&template_path, page)
            })));
        }
        let template = self.renderer.t.get_template(&name)?;

        let content = template.render(context! {
            ..minijinja::Value::from_serialize(self.ctx),
        });

        let mut paginate = PAGINATOR.with_borrow_mut(|paginator| {
            paginator
                .as_mut()
                .map(|paginator| paginator.paginate())
                .unwrap_or(false)
        });

        let mut pages = vec![content
            .map(|content| (template_path.clone(), content))
            .map_err(anyhow::Error::from)];

        if pages[0].is_ok() && paginate {
            let mut page = 0;

            while paginate {
                page += 1;
                let content = template.render(context! {
                    ..minijinja::Value::from_serialize(self.ctx),
                });
                pages.push(
                    content
                        .map(|content| (page_out_file(&template_path, page), content))
                        .map_err(anyhow::Error::from),
                );

                paginate = PAGINATOR.with_borrow_mut(|paginator| {
                    paginator
                        .as_mut()
                        .map(|paginator| paginator.paginate())
                        .unwrap_or(false)
                });
            }
        }

        pagination_reset();
        Ok(pages.into_iter())
    }
}
