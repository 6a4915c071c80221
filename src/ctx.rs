use std::{path::Path, sync::Arc};

use crate::{cli::BuildKind, config::SiteConfig, highlight::Languages, utils};

struct InnerCtx {
    build_kind: BuildKind,
    site_url: String,
    base_url: String,
    trim_index_html: bool,
    year: i32,
    languages: Languages,
}

/// Site build context. The context is cheap to clone.
#[derive(Clone)]
pub struct Ctx {
    inner: Arc<InnerCtx>,
}

impl Ctx {
    /// `year` is the year of the build. It is fixed for the whole build so that rendering the same
    /// input twice gives the same output.
    pub fn from_site_config(build_kind: BuildKind, site_config: &SiteConfig, year: i32) -> Self {
        let site_url = if build_kind.is_production() {
            &site_config.url
        } else {
            &site_config.url_develop
        };
        Ctx {
            inner: Arc::new(InnerCtx {
                build_kind,
                site_url: site_url.trim_end_matches('/').to_owned(),
                base_url: site_config.base_url.clone(),
                trim_index_html: site_config.links.trim_index_html,
                year,
                languages: Languages::new(&site_config.prism.additional_languages),
            }),
        }
    }

    pub fn build_kind(&self) -> BuildKind {
        self.inner.build_kind
    }

    /// Scheme, host and optional path of the site, without a trailing slash.
    pub fn site_url(&self) -> &str {
        &self.inner.site_url
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn year(&self) -> i32 {
        self.inner.year
    }

    pub fn languages(&self) -> &Languages {
        &self.inner.languages
    }

    /// Turn a path relative to the output directory into a URL path on this site, e.g.,
    /// `blog/index.html` becomes `/blog`.
    pub fn path_to_route(&self, path: impl AsRef<Path>) -> anyhow::Result<String> {
        let mut url = utils::path_to_url(Some(self.inner.base_url.trim_end_matches('/')), path)?;
        if self.inner.trim_index_html && url.ends_with("/index.html") {
            url.truncate(url.len() - "/index.html".len());
        }
        if url.is_empty() {
            url.push('/');
        }
        Ok(url)
    }

    /// Turn a path relative to the output directory into an absolute URL.
    pub fn path_to_absolute_url(&self, path: impl AsRef<Path>) -> anyhow::Result<String> {
        Ok(format!("{}{}", self.site_url(), self.path_to_route(path)?))
    }

    /// Prefix an internal link destination (starting with a slash) with the base URL.
    pub fn internal_url(&self, to: &str) -> String {
        format!("{}{}", self.inner.base_url.trim_end_matches('/'), to)
    }
}

#[cfg(test)]
mod test {
    use super::{BuildKind, Ctx, SiteConfig};
    use std::path::PathBuf;

    fn site_config(base_url: &str) -> SiteConfig {
        let mut site_config: SiteConfig = toml::from_str(crate::tests::SITE_TOML).unwrap();
        site_config.base_url = base_url.to_owned();
        site_config
    }

    #[test]
    fn path_to_absolute_url() {
        let ctx = Ctx::from_site_config(BuildKind::Production, &site_config("/"), 2026);

        assert_eq!(
            ctx.path_to_absolute_url("").unwrap(),
            "https://mickaelcrl.github.io/test-github-pages/"
        );
        assert_eq!(
            ctx.path_to_absolute_url("index.html").unwrap(),
            "https://mickaelcrl.github.io/test-github-pages/"
        );
        assert_eq!(
            ctx.path_to_absolute_url(PathBuf::from("blog").join("rss.xml"))
                .unwrap(),
            "https://mickaelcrl.github.io/test-github-pages/blog/rss.xml"
        );
        assert_eq!(
            ctx.path_to_absolute_url(PathBuf::from("blog").join("tags").join("index.html"))
                .unwrap(),
            "https://mickaelcrl.github.io/test-github-pages/blog/tags"
        );
    }

    #[test]
    fn routes_under_base_url() {
        let ctx = Ctx::from_site_config(BuildKind::Production, &site_config("/site/"), 2026);

        assert_eq!(ctx.path_to_route("index.html").unwrap(), "/site");
        assert_eq!(
            ctx.path_to_route(PathBuf::from("blog").join("index.html")).unwrap(),
            "/site/blog"
        );
        assert_eq!(ctx.internal_url("/blog"), "/site/blog");
    }

    #[test]
    fn develop_url() {
        let ctx = Ctx::from_site_config(BuildKind::Develop, &site_config("/"), 2026);

        assert!(ctx.build_kind().is_develop());
        assert_eq!(
            ctx.path_to_absolute_url("404.html").unwrap(),
            "http://localhost:3000/404.html"
        );
    }
}
