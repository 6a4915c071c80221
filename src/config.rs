use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::palette::Palette;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("`{0}` must not be empty")]
    Empty(&'static str),
    #[error("`{field}` is not an absolute URL: {value:?}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },
    #[error("`base-url` must start and end with a slash, got {0:?}")]
    BaseUrl(String),
    #[error("`i18n.locales` must contain at least one locale")]
    NoLocales,
    #[error("`i18n.default-locale` {0:?} is not one of `i18n.locales`")]
    UnknownDefaultLocale(String),
    #[error("unknown highlight palette {0:?}")]
    UnknownPalette(String),
    #[error("link {label:?} must set exactly one of `to` and `href`")]
    LinkTarget { label: String },
    #[error("internal link {label:?} must start with a slash, got {to:?}")]
    InternalLink { label: String, to: String },
    #[error("`blog.posts-per-page` must be larger than zero")]
    PostsPerPage,
}

/// What to do when a check finds a problem during the build.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportingSeverity {
    Ignore,
    Log,
    #[default]
    Warn,
    Throw,
}

impl ReportingSeverity {
    /// Report a problem. Returns whether the problem must fail the build.
    pub fn report(self, message: impl std::fmt::Display) -> bool {
        match self {
            ReportingSeverity::Ignore => false,
            ReportingSeverity::Log => {
                log::info!("{message}");
                false
            }
            ReportingSeverity::Warn => {
                log::warn!("{message}");
                false
            }
            ReportingSeverity::Throw => {
                log::error!("{message}");
                true
            }
        }
    }
}

fn default_url_develop() -> String {
    "http://localhost:3000".to_owned()
}

fn default_base_url() -> String {
    "/".to_owned()
}

fn default_throw() -> ReportingSeverity {
    ReportingSeverity::Throw
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct SiteConfig {
    pub title: String,
    pub tagline: String,
    pub favicon: String,
    pub url: String,
    #[serde(default = "default_url_develop")]
    pub url_develop: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,

    pub organization_name: Option<String>,
    pub project_name: Option<String>,
    pub deployment_branch: Option<String>,

    #[serde(default = "default_throw")]
    pub on_broken_links: ReportingSeverity,
    #[serde(default)]
    pub on_broken_markdown_links: ReportingSeverity,

    pub i18n: I18n,
    #[serde(default)]
    pub blog: BlogConfig,
    #[serde(default)]
    pub theme: ThemeConfig,
    pub navbar: Navbar,
    #[serde(default)]
    pub footer: Footer,
    #[serde(default)]
    pub color_mode: ColorMode,
    #[serde(default)]
    pub prism: Prism,
    #[serde(default)]
    pub links: Links,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct I18n {
    pub default_locale: String,
    pub locales: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedType {
    Rss,
    Atom,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all(deserialize = "kebab-case"), default)]
pub struct BlogConfig {
    /// Directory holding the posts, relative to the site directory.
    pub path: PathBuf,
    pub title: String,
    pub description: String,
    pub show_reading_time: bool,
    pub posts_per_page: u32,
    pub feed_types: Vec<FeedType>,
    pub feed_xslt: bool,
    pub on_inline_tags: ReportingSeverity,
    pub on_inline_authors: ReportingSeverity,
    pub on_untruncated_blog_posts: ReportingSeverity,
}

impl Default for BlogConfig {
    fn default() -> Self {
        BlogConfig {
            path: PathBuf::from("blog"),
            title: "Blog".to_owned(),
            description: "Blog".to_owned(),
            show_reading_time: true,
            posts_per_page: 10,
            feed_types: vec![FeedType::Rss, FeedType::Atom],
            feed_xslt: false,
            on_inline_tags: ReportingSeverity::Warn,
            on_inline_authors: ReportingSeverity::Warn,
            on_untruncated_blog_posts: ReportingSeverity::Warn,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct ThemeConfig {
    pub custom_css: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Left,
    Right,
}

/// A link shown in the navbar or the footer. Exactly one of `to` (a path on this site) and `href`
/// (rendered verbatim) is set.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct LinkItem {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default)]
    pub position: Position,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LinkTarget<'a> {
    Internal(&'a str),
    External(&'a str),
}

impl LinkItem {
    pub fn target(&self) -> Result<LinkTarget<'_>, ConfigError> {
        match (&self.to, &self.href) {
            (Some(to), None) => {
                if to.starts_with('/') {
                    Ok(LinkTarget::Internal(to))
                } else {
                    Err(ConfigError::InternalLink {
                        label: self.label.clone(),
                        to: to.clone(),
                    })
                }
            }
            (None, Some(href)) => Ok(LinkTarget::External(href)),
            _ => Err(ConfigError::LinkTarget {
                label: self.label.clone(),
            }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Logo {
    pub alt: String,
    pub src: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct Navbar {
    pub title: String,
    pub logo: Option<Logo>,
    #[serde(default)]
    pub hide_on_scroll: bool,
    #[serde(default)]
    pub items: Vec<LinkItem>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Light,
    Dark,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct FooterGroup {
    pub title: String,
    #[serde(default)]
    pub items: Vec<LinkItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Footer {
    #[serde(default)]
    pub style: Mode,
    #[serde(default)]
    pub links: Vec<FooterGroup>,
    /// Copyright line. `{year}` is replaced by the year of the build.
    pub copyright: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all(deserialize = "kebab-case"), default)]
pub struct ColorMode {
    pub default_mode: Mode,
    pub disable_switch: bool,
    pub respect_prefers_color_scheme: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all(deserialize = "kebab-case"), default)]
pub struct Prism {
    pub theme: String,
    pub dark_theme: String,
    pub additional_languages: Vec<String>,
}

impl Default for Prism {
    fn default() -> Self {
        Prism {
            theme: "github".to_owned(),
            dark_theme: "dracula".to_owned(),
            additional_languages: Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all(deserialize = "kebab-case"))]
pub struct Links {
    #[serde(default = "default_true")]
    pub trim_index_html: bool,
}

impl Default for Links {
    fn default() -> Self {
        Links {
            trim_index_html: true,
        }
    }
}

fn non_empty(field: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::Empty(field))
    } else {
        Ok(())
    }
}

fn absolute_url(field: &'static str, value: &str) -> Result<(), ConfigError> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|source| ConfigError::InvalidUrl {
            field,
            value: value.to_owned(),
            source,
        })
}

impl SiteConfig {
    /// Read, parse and validate the site configuration at `path`.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<SiteConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Reading {}", path.display()))?;
        let site_config: SiteConfig =
            toml::from_str(&content).with_context(|| format!("Parsing {}", path.display()))?;
        site_config
            .validate()
            .with_context(|| format!("Validating {}", path.display()))?;

        Ok(site_config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        non_empty("title", &self.title)?;
        non_empty("tagline", &self.tagline)?;
        non_empty("favicon", &self.favicon)?;
        non_empty("navbar.title", &self.navbar.title)?;

        absolute_url("url", &self.url)?;
        absolute_url("url-develop", &self.url_develop)?;

        if !self.base_url.starts_with('/') || !self.base_url.ends_with('/') {
            return Err(ConfigError::BaseUrl(self.base_url.clone()));
        }

        if self.i18n.locales.is_empty() {
            return Err(ConfigError::NoLocales);
        }
        if !self.i18n.locales.contains(&self.i18n.default_locale) {
            return Err(ConfigError::UnknownDefaultLocale(
                self.i18n.default_locale.clone(),
            ));
        }

        for name in [&self.prism.theme, &self.prism.dark_theme] {
            if Palette::by_name(name).is_none() {
                return Err(ConfigError::UnknownPalette(name.clone()));
            }
        }

        for item in self
            .navbar
            .items
            .iter()
            .chain(self.footer.links.iter().flat_map(|group| &group.items))
        {
            non_empty("link label", &item.label)?;
            item.target()?;
        }

        if self.blog.posts_per_page == 0 {
            return Err(ConfigError::PostsPerPage);
        }

        Ok(())
    }

    /// The locale pages are rendered in.
    pub fn locale(&self) -> &str {
        &self.i18n.default_locale
    }

    pub fn copyright(&self, year: i32) -> Option<String> {
        self.footer
            .copyright
            .as_ref()
            .map(|copyright| copyright.replace("{year}", &year.to_string()))
    }
}
