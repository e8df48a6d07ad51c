use clap::Parser;
use page_audit::{Audit, PageSource, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "page-audit")]
#[command(about = "Finds broken outbound links on a web page")]
#[command(version)]
pub struct Args {
    /// Page to audit
    pub url: String,

    /// JSON configuration file; command-line flags take precedence
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Fetch the raw HTML instead of driving a browser
    #[arg(long = "static")]
    pub static_html: bool,

    /// Number of links checked in parallel
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Overall deadline for the link checks, in seconds
    #[arg(long)]
    pub batch_timeout: Option<u64>,

    /// Do not scroll through the page collecting elements
    #[arg(long)]
    pub skip_elements: bool,

    /// Print the full report as JSON
    #[arg(long)]
    pub json: bool,
}

impl Args {
    /// Build the audit described by the command line
    pub fn to_audit(&self) -> Result<Audit> {
        let mut audit = match &self.config {
            Some(path) => Audit::new(&self.url)
                .with_config_file(path)?
                .with_page_url(&self.url),
            None => Audit::new(&self.url),
        };

        if self.static_html {
            audit = audit.with_source(PageSource::Static);
        }
        if let Some(concurrency) = self.concurrency {
            audit = audit.with_max_concurrency(concurrency);
        }
        if let Some(timeout) = self.batch_timeout {
            audit = audit.with_batch_timeout(timeout);
        }
        if self.skip_elements {
            audit = audit.with_element_traversal(false);
        }

        Ok(audit)
    }
}
