use clap::Parser;
use page_audit::{AuditConfig, AuditReport, PageSource};

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    let args = Args::parse();

    let audit = match args.to_audit() {
        Ok(audit) => audit,
        Err(e) => {
            ::log::error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    if let Some(note) = stdout_note(audit.config(), args.json) {
        println!("{note}");
    }

    let start_time = std::time::Instant::now();
    let report = match audit.run().await {
        Ok(report) => report,
        Err(e) => {
            ::log::error!("Audit failed: {}", e);
            std::process::exit(1);
        }
    };
    ::log::info!(
        "Audit complete in {:.2} seconds",
        start_time.elapsed().as_secs_f64()
    );

    if args.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                ::log::error!("Failed to serialize report: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        print_report(&report);
    }
}

fn webdriver_note(config: &AuditConfig) -> Option<String> {
    (config.source == PageSource::Browser).then(|| {
        format!(
            "Note: browser audits require a WebDriver server (e.g., ChromeDriver).\n\
             Set WEBDRIVER_URL environment variable if not using the default {}",
            config.webdriver_url
        )
    })
}

/// The WebDriver reminder, unless stdout is reserved for the JSON report
fn stdout_note(config: &AuditConfig, json: bool) -> Option<String> {
    let note = webdriver_note(config)?;
    if json {
        ::log::info!("{}", note.replace('\n', " "));
        return None;
    }
    Some(note)
}

fn print_report(report: &AuditReport) {
    let links = &report.links;
    println!("Page: {}", report.page_url);
    println!(
        "Links: {} found, {} unique, {} checked",
        links.candidates, links.unique_links, links.checked
    );
    println!("Unique elements: {}", report.unique_elements);

    let mut broken = links.broken.iter().collect::<Vec<_>>();
    broken.sort_by(|a, b| a.url.cmp(&b.url));

    println!("\n=== Broken Links ===");
    if broken.is_empty() {
        println!("No broken links found.");
    }
    for link in broken {
        println!("{} [{}] {} (text: {:?})", link.status.http_code, link.status.reason, link.url, link.text);
    }

    if !links.unresolved.is_empty() || !links.timed_out.is_empty() {
        println!("\n=== Not Determined ===");
        for url in &links.unresolved {
            println!("connection failed: {url}");
        }
        for url in &links.timed_out {
            println!("check timed out: {url}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_flag_parses() {
        let args = Args::parse_from(["page-audit", "https://site.com/", "--json"]);
        assert!(args.json);
        assert!(!args.static_html);
    }

    #[test]
    fn test_webdriver_note_only_for_browser_audits() {
        let mut config = AuditConfig::new("https://site.com/");
        let note = webdriver_note(&config).unwrap();
        assert!(note.contains("WEBDRIVER_URL"));
        assert!(note.contains(&config.webdriver_url));

        config.source = PageSource::Static;
        assert!(webdriver_note(&config).is_none());
    }

    #[test]
    fn test_json_mode_keeps_stdout_clean() {
        let config = AuditConfig::new("https://site.com/");
        assert!(stdout_note(&config, false).is_some());
        assert!(stdout_note(&config, true).is_none());
    }
}
