use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BuildKind {
    Production,
    Develop,
}

impl BuildKind {
    pub fn is_production(self) -> bool {
        matches!(self, BuildKind::Production)
    }

    #[allow(unused)]
    pub fn is_develop(self) -> bool {
        matches!(self, BuildKind::Develop)
    }
}

#[derive(Debug, Parser)]
pub struct BuildCommand {
    /// Rebuild whenever a file in the site directory changes.
    #[arg(short, long, default_value = "false")]
    pub watch: bool,
    /// Build against `url-develop` and include draft posts.
    #[arg(short, long, default_value = "false")]
    pub develop: bool,
    #[arg(short, long, default_value = "false")]
    pub verbose: bool,
    /// Output directory. Everything in it is removed before building.
    #[arg(short, long, default_value = "./out")]
    pub out: PathBuf,
    /// Site directory, containing `site.toml`.
    #[arg(default_value = "./")]
    pub path: PathBuf,
}

impl BuildCommand {
    pub fn build_kind(&self) -> BuildKind {
        if self.develop {
            BuildKind::Develop
        } else {
            BuildKind::Production
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    Build(BuildCommand),
}

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Args {
    #[command(subcommand)]
    pub command: Commands,
}
