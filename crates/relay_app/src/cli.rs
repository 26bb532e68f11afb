use std::ops::RangeInclusive;
use std::path::PathBuf;

use clap::Parser;
use relay_logging::LogDestination;
use url::Url;

#[derive(Parser, Debug)]
#[command(
    name = "relay",
    version,
    about = "Stage files, submit them to a conversion server and follow the job to its result"
)]
pub struct Cli {
    /// Tool slug, e.g. merge_pdf, split_pdf, compress_pdf.
    #[arg(required_unless_present_any = ["list_tools", "dump_catalog"])]
    pub tool: Option<String>,

    /// Files to stage, in submission order.
    pub files: Vec<PathBuf>,

    /// Server base url.
    #[arg(long, env = "RELAY_SERVER", default_value = "http://127.0.0.1:8000")]
    pub server: Url,

    /// CSRF token sent with the upload.
    #[arg(long, env = "RELAY_CSRF_TOKEN")]
    pub csrf_token: Option<String>,

    /// RON tool catalog replacing the built-in tool list.
    #[arg(long, env = "RELAY_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Directory the finished artifact is saved into.
    #[arg(short, long, default_value = "output")]
    pub output_dir: PathBuf,

    /// Do not download the artifact, only print its link.
    #[arg(long)]
    pub no_download: bool,

    /// Pages to extract for page tools: all, 5, 2-4 or 1,3,5.
    #[arg(long)]
    pub pages: Option<String>,

    /// Extra form field sent after the files, as key=value. Repeatable.
    #[arg(long = "field", value_parser = parse_field)]
    pub fields: Vec<(String, String)>,

    /// Seconds between status queries.
    #[arg(long, default_value_t = 2.0)]
    pub poll_interval: f64,

    /// Status queries before giving up on a job.
    #[arg(long, default_value_t = 90)]
    pub poll_attempts: u32,

    /// Log file; logs go to the terminal when absent.
    #[arg(long, env = "RELAY_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Keep logging to the terminal when --log-file is given.
    #[arg(long, requires = "log_file")]
    pub log_terminal: bool,

    /// Log debug detail.
    #[arg(short, long)]
    pub verbose: bool,

    /// Print the available tools and exit.
    #[arg(long)]
    pub list_tools: bool,

    /// Print the built-in catalog as RON and exit.
    #[arg(long)]
    pub dump_catalog: bool,
}

impl Cli {
    pub fn log_destination(&self) -> LogDestination {
        match (&self.log_file, self.log_terminal) {
            (Some(path), true) => LogDestination::Both(path.clone()),
            (Some(path), false) => LogDestination::File(path.clone()),
            (None, _) => LogDestination::Terminal,
        }
    }
}

/// Which pages to select once the document has been inspected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageChoice {
    All,
    /// Inclusive ranges as given; single pages are one-page ranges.
    Ranges(Vec<RangeInclusive<u32>>),
}

impl PageChoice {
    /// Requested pages that exist in a document of `page_count` pages,
    /// ascending and without duplicates.
    pub fn pages_within(&self, page_count: u32) -> Vec<u32> {
        let ranges = match self {
            PageChoice::All => return (1..=page_count).collect(),
            PageChoice::Ranges(ranges) => ranges,
        };
        let mut pages = ranges
            .iter()
            .filter(|range| *range.start() <= page_count)
            .flat_map(|range| *range.start()..=(*range.end()).min(page_count))
            .collect::<Vec<_>>();
        pages.sort_unstable();
        pages.dedup();
        pages
    }
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("field name missing in `{raw}`"));
    }
    Ok((key.to_string(), value.to_string()))
}

pub fn parse_pages(raw: &str) -> Result<PageChoice, String> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("all") {
        return Ok(PageChoice::All);
    }
    let mut ranges = Vec::new();
    for token in raw.split(',').map(str::trim).filter(|token| !token.is_empty()) {
        match token.split_once('-') {
            Some((first, last)) => {
                let first = parse_page(first)?;
                let last = parse_page(last)?;
                if first > last {
                    return Err(format!("range `{token}` runs backwards"));
                }
                ranges.push(first..=last);
            }
            None => {
                let page = parse_page(token)?;
                ranges.push(page..=page);
            }
        }
    }
    if ranges.is_empty() {
        return Err("no pages given".to_string());
    }
    Ok(PageChoice::Ranges(ranges))
}

fn parse_page(raw: &str) -> Result<u32, String> {
    match raw.trim().parse::<u32>() {
        Ok(0) => Err("pages are numbered from 1".to_string()),
        Ok(page) => Ok(page),
        Err(_) => Err(format!("`{}` is not a page number", raw.trim())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pages_accept_lists_and_ranges() {
        assert_eq!(parse_pages("all").unwrap(), PageChoice::All);
        let choice = parse_pages("6, 2-4,2").unwrap();
        assert_eq!(choice, PageChoice::Ranges(vec![6..=6, 2..=4, 2..=2]));
        assert_eq!(choice.pages_within(10), vec![2, 3, 4, 6]);
    }

    #[test]
    fn huge_ranges_stay_unexpanded_and_clamp_to_the_document() {
        let choice = parse_pages("8-4000000000,3").unwrap();
        assert_eq!(choice, PageChoice::Ranges(vec![8..=4_000_000_000, 3..=3]));
        assert_eq!(choice.pages_within(10), vec![3, 8, 9, 10]);
        assert_eq!(choice.pages_within(5), vec![3]);
        assert!(parse_pages("40-50").unwrap().pages_within(10).is_empty());
        assert_eq!(PageChoice::All.pages_within(3), vec![1, 2, 3]);
    }

    #[test]
    fn pages_reject_nonsense() {
        assert!(parse_pages("0").is_err());
        assert!(parse_pages("5-2").is_err());
        assert!(parse_pages("x").is_err());
        assert!(parse_pages(" , ").is_err());
    }

    #[test]
    fn fields_split_on_first_equals() {
        assert_eq!(
            parse_field("quality=a=b").unwrap(),
            ("quality".to_string(), "a=b".to_string())
        );
        assert!(parse_field("novalue").is_err());
        assert!(parse_field("=x").is_err());
    }

    #[test]
    fn cli_parses_a_split_invocation() {
        let cli = Cli::try_parse_from([
            "relay",
            "split_pdf",
            "book.pdf",
            "--pages",
            "2,4,6",
            "--field",
            "output=zip",
            "--server",
            "https://convert.example.com",
        ])
        .unwrap();
        assert_eq!(cli.tool.as_deref(), Some("split_pdf"));
        assert_eq!(cli.files, vec![PathBuf::from("book.pdf")]);
        assert_eq!(cli.pages.as_deref(), Some("2,4,6"));
        assert_eq!(cli.fields, vec![("output".to_string(), "zip".to_string())]);
        assert_eq!(cli.server.as_str(), "https://convert.example.com/");
    }

    #[test]
    fn log_file_and_terminal_flags_pick_the_destination() {
        fn parse(args: &[&str]) -> Result<LogDestination, clap::Error> {
            let argv = ["relay", "compress_pdf"].iter().chain(args).copied();
            Cli::try_parse_from(argv).map(|cli| cli.log_destination())
        }
        assert_eq!(parse(&[]).unwrap(), LogDestination::Terminal);
        assert_eq!(
            parse(&["--log-file", "relay.log"]).unwrap(),
            LogDestination::File(PathBuf::from("relay.log"))
        );
        assert_eq!(
            parse(&["--log-file", "relay.log", "--log-terminal"]).unwrap(),
            LogDestination::Both(PathBuf::from("relay.log"))
        );
        assert!(parse(&["--log-terminal"]).is_err());
    }
}
