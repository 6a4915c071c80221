use crate::page::{LinkStyle, Page, Section, SectionKind};

const EMAIL_LINK: &str = "mailto:mickael.ceraline@outlook.com";

fn intro() -> Section {
    Section::new(SectionKind::Intro, &["Développeur Full Stack", "à Paris"])
        .body(&[
            "\"Airbus, Station F, Paris-Saclay. Aujourd’hui à l’EFREI, je cherche des projets qui \
             ont du sens — et je partage mes idées sur mon blog.\"",
        ])
        .link("Me contacter", EMAIL_LINK, LinkStyle::Primary)
        .link(
            "Voir Le Blog",
            "https://mickaelcrl.github.io/test-github-pages/blog",
            LinkStyle::Secondary,
        )
}

fn about() -> Section {
    Section::new(SectionKind::About, &["À propos de moi"])
        .image("/img/aproposdemoi2.jpg", "Image à propos de moi")
        .body(&[
            "Salut, je suis Mickaël Céraline, étudiant en informatique.",
            "Passionné par l'informatique, j'aime résoudre des problèmes et explorer de nouvelles \
             technologies.",
            "En dehors de mes études, je m'investis dans des projets innovants et je cherche \
             toujours de nouvelles opportunités pour développer mes compétences en programmation.",
        ])
}

fn skills() -> Section {
    Section::new(SectionKind::Skills, &["Compétences"])
        .body(&[
            "Mon parcours est caractérisé par une progression constante. Au fil des années, j'ai eu \
             l'opportunité d'explorer diverses technologies et langages de programmation, \
             aboutissant à une liste non exhaustive de mes compétences.",
        ])
        .row(
            "Langages de programmation :",
            "C#, Java, Python, C++, PHP, PL/SQL",
        )
        .row("Technologies web :", "HTML5, CSS3, JavaScript")
        .row("Frameworks JavaScript :", "React, Angular")
        .image("/img/skill.svg", "Image illustrative de vos compétences")
}

fn certification() -> Section {
    Section::new(SectionKind::Certification, &["Ma certification"]).image_with_class(
        "/img/foundational-csharp-certification.png",
        "certification image",
        "centered-image",
    )
}

fn contact() -> Section {
    Section::new(SectionKind::Contact, &["Me contacter"])
        .body(&[
            "Pour toutes vos questions, suggestions ou collaborations, n'hésitez pas à me joindre \
             par email à l'adresse suivante :",
        ])
        .link(
            "mickael.ceraline@outlook.com",
            EMAIL_LINK,
            LinkStyle::Inline,
        )
}

/// The home page. Always the same five sections, in the same order.
pub fn compose() -> Page {
    Page {
        title: "Développeur Full Stack",
        description: "Mickaël Céraline est un jeune développeur Full Stack Angular & .NET C#, \
                      passionné par la création web avec une volonté d'apprendre en continu. \
                      Découvrez mon parcours et mes projets. <head />",
        sections: vec![intro(), about(), skills(), certification(), contact()],
    }
}
