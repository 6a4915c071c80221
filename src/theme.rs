//! The built-in theme. Templates are embedded in the binary; a site can override any of them by
//! placing a template with the same name in its `templates/` directory.

const TEMPLATES: &[(&str, &str)] = &[
    ("_layout.html", include_str!("../theme/_layout.html")),
    ("_macros.html", include_str!("../theme/_macros.html")),
    ("_home.html", include_str!("../theme/_home.html")),
    ("_sections/intro.html", include_str!("../theme/_sections/intro.html")),
    ("_sections/about.html", include_str!("../theme/_sections/about.html")),
    ("_sections/skills.html", include_str!("../theme/_sections/skills.html")),
    (
        "_sections/certification.html",
        include_str!("../theme/_sections/certification.html"),
    ),
    ("_sections/contact.html", include_str!("../theme/_sections/contact.html")),
    ("_post.html", include_str!("../theme/_post.html")),
    ("_tag.html", include_str!("../theme/_tag.html")),
    ("_feeds/rss.xml", include_str!("../theme/_feeds/rss.xml")),
    ("_feeds/atom.xml", include_str!("../theme/_feeds/atom.xml")),
    ("404.html", include_str!("../theme/404.html")),
    ("blog/index.html", include_str!("../theme/blog/index.html")),
    ("blog/tags/index.html", include_str!("../theme/blog/tags/index.html")),
    ("sitemap.xml", include_str!("../theme/sitemap.xml")),
];

/// Static theme files, by output path.
pub const ASSETS: &[(&str, &str)] = &[(
    "assets/css/theme.css",
    include_str!("../theme/assets/css/theme.css"),
)];

/// Feed stylesheets, written next to the feeds when `feed-xslt` is set.
pub const RSS_XSL: &str = include_str!("../theme/assets/rss.xsl");
pub const ATOM_XSL: &str = include_str!("../theme/assets/atom.xsl");

pub fn template(name: &str) -> Option<&'static str> {
    TEMPLATES
        .iter()
        .find(|(template_name, _)| *template_name == name)
        .map(|(_, source)| *source)
}

/// Built-in templates that render to a page of their own.
pub fn page_templates() -> impl Iterator<Item = &'static str> {
    TEMPLATES
        .iter()
        .map(|(name, _)| *name)
        .filter(|name| !name.split('/').any(|part| part.starts_with('_')))
}

#[cfg(test)]
mod test {
    #[test]
    fn page_templates() {
        let names: Vec<_> = super::page_templates().collect();
        assert_eq!(
            names,
            ["404.html", "blog/index.html", "blog/tags/index.html", "sitemap.xml"]
        );
    }

    #[test]
    fn every_section_kind_has_a_template() {
        for kind in crate::page::SectionKind::ALL {
            let name = format!("_sections/{}.html", format!("{kind:?}").to_lowercase());
            assert!(super::template(&name).is_some(), "missing {name}");
        }
    }
}
