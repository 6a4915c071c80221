#![cfg(test)]

use std::path::{Path, PathBuf};

use crate::{
    cli::BuildKind,
    config::SiteConfig,
    render::Renderer,
    types::{Date, Post, PostMeta},
    Ctx,
};

pub const SITE_TOML: &str = include_str!("../site/site.toml");

pub fn site_config() -> SiteConfig {
    toml::from_str(SITE_TOML).unwrap()
}

pub fn ctx() -> Ctx {
    Ctx::from_site_config(BuildKind::Production, &site_config(), 2026)
}

pub fn develop_ctx() -> Ctx {
    Ctx::from_site_config(BuildKind::Develop, &site_config(), 2026)
}

pub fn renderer() -> Renderer {
    Renderer::build(&ctx(), &site_config(), None).unwrap()
}

/// `count` posts, newest first, one per day counting back from 2024-01-28.
pub fn posts(count: usize) -> Vec<Post> {
    let ctx = ctx();

    (0..count)
        .map(|idx| {
            let day = 28 - (idx % 28) as u8;
            let slug = format!("post-{idx}");
            let out_file = PathBuf::from("blog")
                .join("2024")
                .join("01")
                .join(format!("{day:02}"))
                .join(&slug)
                .join("index.html");

            Post {
                meta: PostMeta {
                    sort_key: format!("2024-01-{day:02}_{slug}"),
                    date: Date::new(2024, 1, day),
                    time: None,
                    file_path: PathBuf::from("blog").join(format!("2024-01-{day:02}_{slug}.md")),
                    route: ctx.path_to_route(&out_file).unwrap(),
                    permalink: ctx.path_to_absolute_url(&out_file).unwrap(),
                    slug,
                    out_file,
                },
                title: format!("Article {idx}"),
                description: None,
                authors: Vec::new(),
                tags: Vec::new(),
                summary: "<p>Résumé</p>\n".to_owned(),
                content: "<p>Résumé</p>\n<p>Suite</p>\n".to_owned(),
                truncated: true,
                reading_time: 1,
                date_rfc2822: format!("Sun, {day:02} Jan 2024 00:00:00 +0000"),
                date_rfc3339: format!("2024-01-{day:02}T00:00:00+00:00"),
                assets: Vec::new(),
            }
        })
        .collect()
}

mod build {
    use std::path::Path;

    use super::{ctx, site_config, SITE_TOML};
    use crate::{links::LinkError, render::Renderer};

    fn write(path: &Path, content: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    /// A small site: the shipped configuration, two posts (one in its own directory, with an
    /// image next to it), predefined authors and tags, custom CSS and a logo.
    fn site() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let site = dir.path();

        write(&site.join("site.toml"), SITE_TOML);
        write(&site.join("css").join("custom.css"), ":root { --ifm-color-primary: #000; }");
        write(&site.join("static").join("img").join("MC.svg"), "<svg/>");
        write(
            &site.join("blog").join("authors.toml"),
            "[mickael]\nname = \"Mickaël Céraline\"\nurl = \"https://github.com/MickaelCRL\"\n",
        );
        write(
            &site.join("blog").join("tags.toml"),
            "[dotnet]\nlabel = \".NET\"\n\n[web]\nlabel = \"Web\"\n",
        );
        write(
            &site.join("blog").join("2024-10-02_bienvenue.md"),
            "---\ntitle: Bienvenue\nauthors: [mickael]\ntags: [web]\n---\n\
             Premier article, voir [la suite](2024-11-15_csharp/index.md).\n\n\
             <!-- truncate -->\n\nLe reste.\n",
        );
        write(
            &site.join("blog").join("2024-11-15_csharp").join("index.md"),
            "+++\ntitle = \"C# & .NET\"\nauthors = [\"mickael\"]\ntags = [\"dotnet\", \"web\"]\n+++\n\
             Un peu de code.\n\n<!-- truncate -->\n\n\
             ![Schéma](./schema.svg)\n\n\
             ```rust\nfn main() {}\n```\n\n\
             ```cs\nvar langages = new[] { \"C#\" };\n```\n",
        );
        write(
            &site.join("blog").join("2024-11-15_csharp").join("schema.svg"),
            "<svg/>",
        );

        dir
    }

    fn build(site: &Path, out: &Path) -> anyhow::Result<()> {
        let site_config = site_config();
        let ctx = ctx();
        let renderer = Renderer::build(&ctx, &site_config, Some(site.join("templates")))?;
        crate::build(site, out, &site_config, &ctx, &renderer)
    }

    #[test]
    fn builds_site() {
        let site = site();
        let out = site.path().join("out");
        build(site.path(), &out).unwrap();

        for file in [
            "index.html",
            "404.html",
            "sitemap.xml",
            "img/MC.svg",
            "assets/css/theme.css",
            "assets/css/highlight.css",
            "assets/css/custom.css",
            "blog/index.html",
            "blog/rss.xml",
            "blog/atom.xml",
            "blog/rss.xsl",
            "blog/atom.xsl",
            "blog/tags/index.html",
            "blog/tags/dotnet/index.html",
            "blog/tags/web/index.html",
            "blog/2024/10/02/bienvenue/index.html",
            "blog/2024/11/15/csharp/index.html",
            "blog/2024/11/15/csharp/schema.svg",
        ] {
            assert!(out.join(file).is_file(), "missing {file}");
        }

        let index = std::fs::read_to_string(out.join("index.html")).unwrap();
        assert_eq!(index.matches("<section").count(), 5);

        let post =
            std::fs::read_to_string(out.join("blog/2024/10/02/bienvenue/index.html")).unwrap();
        assert!(post.contains(r#"<a href="/blog/2024/11/15/csharp">la suite</a>"#));
        assert!(post.contains("Mickaël Céraline"));

        let post = std::fs::read_to_string(out.join("blog/2024/11/15/csharp/index.html")).unwrap();
        assert!(post.contains(r#"src="/blog/2024/11/15/csharp/schema.svg""#));
        assert!(post.contains(r#"<pre class="highlight"><code data-lang="rust">"#));
        assert!(post.contains(r#"<pre class="highlight"><code data-lang="csharp">"#));

        let blog = std::fs::read_to_string(out.join("blog/index.html")).unwrap();
        let newest = blog.find("C# &amp; .NET").unwrap();
        let oldest = blog.find("Bienvenue").unwrap();
        assert!(newest < oldest);

        let rss = std::fs::read_to_string(out.join("blog/rss.xml")).unwrap();
        assert!(rss.starts_with("<?xml"));
        assert!(rss.contains(r#"<?xml-stylesheet type="text/xsl" href="/blog/rss.xsl"?>"#));
        assert!(rss.contains(
            "<link>https://mickaelcrl.github.io/test-github-pages/blog/2024/11/15/csharp</link>"
        ));
        assert_eq!(rss.matches("<item>").count(), 2);

        let sitemap = std::fs::read_to_string(out.join("sitemap.xml")).unwrap();
        assert!(sitemap.contains(
            "<loc>https://mickaelcrl.github.io/test-github-pages/blog/tags/dotnet</loc>"
        ));

        let highlight = std::fs::read_to_string(out.join("assets/css/highlight.css")).unwrap();
        assert!(highlight.contains("[data-theme='light']"));
        assert!(highlight.contains("[data-theme='dark']"));
    }

    #[test]
    fn builds_on_a_single_thread() {
        let site = site();
        let out = site.path().join("out");
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(1)
            .build()
            .unwrap();
        pool.install(|| build(site.path(), &out)).unwrap();

        assert!(out.join("blog/2024/11/15/csharp/index.html").is_file());
        assert!(out.join("blog/tags/web/index.html").is_file());
        assert!(out.join("blog/rss.xml").is_file());
        assert!(out.join("404.html").is_file());
    }

    #[test]
    fn broken_links_fail_the_build() {
        let site = site();
        write(
            &site.path().join("templates").join("404.html"),
            r#"{% extends "_layout.html" %}{% block main %}<a href="/docs/intro">Docs</a>{% endblock %}"#,
        );

        let err = build(site.path(), &site.path().join("out")).unwrap_err();
        let LinkError::Broken(broken) = err.downcast::<LinkError>().unwrap();
        assert_eq!(broken.len(), 1);
        assert_eq!(broken[0].page, Path::new("404.html"));
        assert_eq!(broken[0].href, "/docs/intro");
    }

    #[test]
    fn site_templates_override_the_theme() {
        let site = site();
        write(
            &site.path().join("templates").join("404.html"),
            r#"{% extends "_layout.html" %}{% block main %}<p>Perdu ?</p>{% endblock %}"#,
        );
        write(
            &site.path().join("templates").join("humans.txt"),
            "{{ site.title }}",
        );
        write(
            &site.path().join("templates").join("_partial.html"),
            "not a page",
        );

        let out = site.path().join("out");
        build(site.path(), &out).unwrap();

        let not_found = std::fs::read_to_string(out.join("404.html")).unwrap();
        assert!(not_found.contains("<p>Perdu ?</p>"));
        assert_eq!(
            std::fs::read_to_string(out.join("humans.txt")).unwrap(),
            "Mickaël Céraline"
        );
        assert!(!out.join("_partial.html").exists());
    }
}

#[test]
fn shipped_site_builds() {
    let dir = tempfile::tempdir().unwrap();
    let site = Path::new(env!("CARGO_MANIFEST_DIR")).join("site");
    let site_config = SiteConfig::load(site.join("site.toml")).unwrap();
    let ctx = ctx();
    let renderer = Renderer::build(&ctx, &site_config, Some(site.join("templates"))).unwrap();

    crate::build(&site, dir.path(), &site_config, &ctx, &renderer).unwrap();
    assert!(dir.path().join("index.html").is_file());

    // Every link, image and `<link>` resource of the shipped site resolves.
    let mut known = std::collections::HashSet::new();
    let mut pages = Vec::new();
    for entry in walkdir::WalkDir::new(dir.path()) {
        let entry = entry.unwrap();
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path().strip_prefix(dir.path()).unwrap().to_owned();
        if path.extension().is_some_and(|ext| ext == "html") {
            pages.push((path.clone(), std::fs::read_to_string(entry.path()).unwrap()));
        }
        known.insert(path);
    }
    assert_eq!(crate::links::check(&ctx, &pages, &known).unwrap(), []);
}
