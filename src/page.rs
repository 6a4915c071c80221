//! Static pages assembled from fixed content sections.

use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SectionKind {
    Intro,
    About,
    Skills,
    Certification,
    Contact,
}

impl SectionKind {
    /// All section kinds, in the order they appear on the home page.
    #[cfg(test)]
    pub const ALL: [SectionKind; 5] = [
        SectionKind::Intro,
        SectionKind::About,
        SectionKind::Skills,
        SectionKind::Certification,
        SectionKind::Contact,
    ];
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkStyle {
    /// White call-to-action button.
    Primary,
    /// Black call-to-action button.
    Secondary,
    /// Plain link inside the body text.
    Inline,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Link {
    pub label: &'static str,
    pub href: &'static str,
    pub style: LinkStyle,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Image {
    pub src: &'static str,
    pub alt: &'static str,
    pub class: Option<&'static str>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GridRow {
    pub label: &'static str,
    pub value: &'static str,
}

/// One self-contained, non-interactive block of a page. `heading` and `body` are lists of lines,
/// rendered with line breaks in between.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Section {
    pub kind: SectionKind,
    pub heading: Vec<&'static str>,
    pub body: Vec<&'static str>,
    pub image: Option<Image>,
    pub links: Vec<Link>,
    pub grid: Vec<GridRow>,
}

impl Section {
    pub fn new(kind: SectionKind, heading: &[&'static str]) -> Self {
        Section {
            kind,
            heading: heading.to_vec(),
            body: Vec::new(),
            image: None,
            links: Vec::new(),
            grid: Vec::new(),
        }
    }

    pub fn body(mut self, lines: &[&'static str]) -> Self {
        self.body.extend_from_slice(lines);
        self
    }

    pub fn image(mut self, src: &'static str, alt: &'static str) -> Self {
        self.image = Some(Image {
            src,
            alt,
            class: None,
        });
        self
    }

    pub fn image_with_class(
        mut self,
        src: &'static str,
        alt: &'static str,
        class: &'static str,
    ) -> Self {
        self.image = Some(Image {
            src,
            alt,
            class: Some(class),
        });
        self
    }

    pub fn link(mut self, label: &'static str, href: &'static str, style: LinkStyle) -> Self {
        self.links.push(Link { label, href, style });
        self
    }

    pub fn row(mut self, label: &'static str, value: &'static str) -> Self {
        self.grid.push(GridRow { label, value });
        self
    }
}

/// A page rendered inside the site layout. `title` and `description` go into the document head.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Page {
    pub title: &'static str,
    pub description: &'static str,
    pub sections: Vec<Section>,
}
