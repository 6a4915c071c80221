//! Color palettes for highlighted code blocks. The highlighter emits the highlight names of
//! `highlight::HIGHLIGHT_NAMES` as classes; a palette maps those classes to CSS declarations.

use std::fmt::Write;

use crate::config::Mode;

pub struct Palette {
    pub name: &'static str,
    pub background: &'static str,
    pub foreground: &'static str,
    styles: &'static [(&'static str, &'static str)],
}

static PALETTES: &[Palette] = &[
    Palette {
        name: "github",
        background: "#f6f8fa",
        foreground: "#393a34",
        styles: &[
            ("comment", "color: #999988; font-style: italic"),
            ("string", "color: #e3116c"),
            ("string.special", "color: #e3116c"),
            ("punctuation", "color: #393a34"),
            ("operator", "color: #393a34"),
            ("keyword", "color: #00009f"),
            ("tag", "color: #00009f"),
            ("type", "color: #00009f"),
            ("function", "color: #d73a49"),
            ("function.builtin", "color: #d73a49"),
            ("attribute", "color: #00a4db"),
            ("constant", "color: #36acaa"),
            ("property", "color: #36acaa"),
            ("variable", "color: #36acaa"),
        ],
    },
    Palette {
        name: "dracula",
        background: "#282a36",
        foreground: "#f8f8f2",
        styles: &[
            ("comment", "color: #6272a4"),
            ("string", "color: #ff79c6"),
            ("string.special", "color: #ff79c6"),
            ("tag", "color: #ff79c6"),
            ("punctuation", "color: #f8f8f2"),
            ("operator", "color: #f8f8f2"),
            ("keyword", "color: #bd93f9; font-style: italic"),
            ("variable", "color: #bd93f9; font-style: italic"),
            ("constant", "color: #bd93f9"),
            ("function.builtin", "color: #bd93f9"),
            ("function", "color: #50fa7b"),
            ("attribute", "color: #f1fa8c"),
            ("property", "color: #ffb86c"),
            ("type", "color: #8be9fd"),
        ],
    },
    Palette {
        name: "vs-dark",
        background: "#1e1e1e",
        foreground: "#9cdcfe",
        styles: &[
            ("comment", "color: #6a9955"),
            ("string", "color: #ce9178"),
            ("string.special", "color: #d16969"),
            ("punctuation", "color: #d4d4d4"),
            ("operator", "color: #d4d4d4"),
            ("keyword", "color: #569cd6"),
            ("tag", "color: #569cd6"),
            ("function", "color: #dcdcaa"),
            ("function.builtin", "color: #dcdcaa"),
            ("type", "color: #4ec9b0"),
            ("constant", "color: #4fc1ff"),
            ("attribute", "color: #9cdcfe"),
            ("property", "color: #9cdcfe"),
            ("variable", "color: #9cdcfe"),
        ],
    },
    Palette {
        name: "one-light",
        background: "#fafafa",
        foreground: "#383a42",
        styles: &[
            ("comment", "color: #a0a1a7; font-style: italic"),
            ("string", "color: #50a14f"),
            ("string.special", "color: #50a14f"),
            ("punctuation", "color: #383a42"),
            ("operator", "color: #0184bc"),
            ("keyword", "color: #a626a4"),
            ("tag", "color: #e45649"),
            ("function", "color: #4078f2"),
            ("function.builtin", "color: #0184bc"),
            ("type", "color: #c18401"),
            ("constant", "color: #986801"),
            ("attribute", "color: #986801"),
            ("property", "color: #e45649"),
            ("variable", "color: #e45649"),
        ],
    },
];

impl Palette {
    pub fn by_name(name: &str) -> Option<&'static Palette> {
        PALETTES.iter().find(|palette| palette.name == name)
    }

    fn push_css(&self, css: &mut String, mode: Mode) -> std::fmt::Result {
        let scope = match mode {
            Mode::Light => "[data-theme='light']",
            Mode::Dark => "[data-theme='dark']",
        };

        writeln!(
            css,
            "{scope} pre.highlight {{ background: {}; color: {}; }}",
            self.background, self.foreground
        )?;
        for (class, declarations) in self.styles {
            // `function.builtin` is emitted as `class="function builtin"`
            writeln!(css, "{scope} pre.highlight .{class} {{ {declarations}; }}")?;
        }

        Ok(())
    }
}

/// Render the stylesheet for highlighted code blocks, scoping each palette to its color mode.
pub fn stylesheet(light: &Palette, dark: &Palette) -> String {
    let mut css = String::new();
    // writing to a `String` cannot fail
    let _ = light.push_css(&mut css, Mode::Light);
    let _ = dark.push_css(&mut css, Mode::Dark);
    css
}
