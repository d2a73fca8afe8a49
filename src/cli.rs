// src/cli.rs
// =============================================================================
// Command-line interface, defined with clap's derive API.
//
//   sitemap-sentinel scan https://example.com
//   sitemap-sentinel scans example.com
//   sitemap-sentinel show example-com latest --json
//   sitemap-sentinel diff example-com previous latest
//   sitemap-sentinel recent https://example.com --days 3
//
// Rust concepts:
// - Global args: `#[arg(global = true)]` flags work before or after the subcommand
// - Option<T> fields become optional arguments
// =============================================================================

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "sitemap-sentinel",
    version,
    about = "Resolve a site's sitemaps, health-check every URL and diff the results over time",
    long_about = "sitemap-sentinel reads a site's robots.txt and sitemap tree, checks every listed URL \
                  concurrently, stores each scan as a snapshot, and compares snapshots to show \
                  what was added, removed or changed."
)]
pub struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory where snapshots are stored (overrides the config file)
    #[arg(long, global = true, env = "SENTINEL_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the sitemaps of a site, check every URL and save a snapshot
    ///
    /// Example: sitemap-sentinel scan https://example.com --concurrency 20
    Scan {
        /// Base URL of the site (e.g., https://example.com)
        base_url: String,

        /// Maximum URLs checked at once (overrides the config file)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Print the snapshot as JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// List stored scans of a site, newest first
    Scans {
        /// Base URL or site id
        site: String,
    },

    /// List every site with at least one stored scan
    Sites,

    /// Print one stored scan
    Show {
        /// Base URL or site id
        site: String,

        /// Scan id, `latest` or `previous` (default: latest)
        scan_id: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Compare two stored scans of a site
    ///
    /// Example: sitemap-sentinel diff example-com previous latest
    Diff {
        /// Base URL or site id
        site: String,

        /// Older scan id (or `previous`)
        old: String,

        /// Newer scan id (or `latest`)
        new: String,

        #[arg(long)]
        json: bool,
    },

    /// List sitemap URLs modified in the last few days (no health checks)
    Recent {
        /// Base URL of the site
        base_url: String,

        /// How many days back to look (1-36500)
        #[arg(long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=36500))]
        days: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_scan() {
        let cli = Cli::parse_from(["sitemap-sentinel", "scan", "https://example.com", "--concurrency", "5"]);
        match cli.command {
            Commands::Scan {
                base_url,
                concurrency,
                json,
            } => {
                assert_eq!(base_url, "https://example.com");
                assert_eq!(concurrency, Some(5));
                assert!(!json);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["sitemap-sentinel", "sites", "--data-dir", "/tmp/s", "-v"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/s")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_recent_default_days() {
        let cli = Cli::parse_from(["sitemap-sentinel", "recent", "https://example.com"]);
        assert!(matches!(cli.command, Commands::Recent { days: 7, .. }));
    }

    #[test]
    fn test_recent_days_is_bounded() {
        assert!(Cli::try_parse_from(["sitemap-sentinel", "recent", "https://example.com", "--days", "0"]).is_err());
        assert!(Cli::try_parse_from(["sitemap-sentinel", "recent", "https://example.com", "--days", "4294967295"]).is_err());
        let cli = Cli::parse_from(["sitemap-sentinel", "recent", "https://example.com", "--days", "36500"]);
        assert!(matches!(cli.command, Commands::Recent { days: 36500, .. }));
    }

    #[test]
    fn test_show_scan_id_is_optional() {
        let cli = Cli::parse_from(["sitemap-sentinel", "show", "example-com"]);
        assert!(matches!(cli.command, Commands::Show { scan_id: None, .. }));
    }
}
