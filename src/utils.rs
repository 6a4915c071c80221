use anyhow::anyhow;
use std::path::Path;

/// Turn a path into a URL with a given prefix. If a scheme and host is given, the path becomes an
/// absolute URL.
pub fn path_to_url(prefix: Option<&str>, path: impl AsRef<Path>) -> anyhow::Result<String> {
    let path = path.as_ref();

    // allocate roughly enough for the resulting string
    let mut builder = String::with_capacity(
        (prefix.map(|s| s.len() + 1).unwrap_or(0) + path.iter().map(|p| p.len() + 1).sum::<usize>())
            .next_power_of_two(),
    );
    if let Some(s) = prefix {
        builder.push_str(s);
    }

    for (idx, part) in path.iter().enumerate() {
        if idx > 0 || prefix.is_some() {
            builder.push('/');
        }
        builder.push_str(part.to_str().ok_or(anyhow!("expected UTF-8 path"))?);
    }

    builder.shrink_to_fit();
    Ok(builder)
}

/// Turn a label into something usable as a single URL path segment: lowercase alphanumerics
/// separated by single dashes.
pub fn slugify(label: &str) -> String {
    let mut slug = String::with_capacity(label.len());
    for c in label.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            slug.push(c);
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod test {
    #[test]
    fn path_to_url() {
        use super::path_to_url;
        use std::path::PathBuf;

        assert_eq!(path_to_url(None, "index.html").unwrap(), "index.html");
        assert_eq!(path_to_url(Some(""), "index.html").unwrap(), "/index.html");
        assert_eq!(
            path_to_url(Some("https://example.com"), "index.html").unwrap(),
            "https://example.com/index.html"
        );
        assert_eq!(
            path_to_url(Some("/base"), PathBuf::from("blog").join("rss.xml")).unwrap(),
            "/base/blog/rss.xml"
        );
    }

    #[test]
    fn slugify() {
        use super::slugify;

        assert_eq!(slugify("Docusaurus"), "docusaurus");
        assert_eq!(slugify("C# & .NET"), "c-net");
        assert_eq!(slugify("  Développement web "), "développement-web");
        assert_eq!(slugify("--"), "");
    }
}
