use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "listpager",
    version,
    about = "paged listing client",
    long_about = "listpager fetches pages from a reservation listing endpoint, remembering page size and position per view.\n\nExamples:\n  listpager -u https://meetings.example.org/reservation-request/list-data\n  listpager -u URL --name rooms --page 2 --page-size 20\n  listpager -u URL --sort DATETIME --sort-desc --format json\n\nTip: Use --config to persist endpoint settings and keep CLI invocations short."
)]
pub struct CliArgs {
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        help_heading = "Output",
        help = "Increase log verbosity (-v, -vv)."
    )]
    pub verbose: u8,

    #[arg(
        long = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'o',
        long = "format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format: text or json."
    )]
    pub format: Option<String>,

    #[arg(
        short = 'u',
        long = "url",
        value_name = "URL",
        help_heading = "Endpoint",
        help = "Listing endpoint URL."
    )]
    pub url: Option<String>,

    #[arg(
        short = 'p',
        long = "param",
        value_name = "KEY=VALUE",
        action = ArgAction::Append,
        help_heading = "Endpoint",
        help = "Extra query parameter sent with every request (repeatable)."
    )]
    pub params: Vec<String>,

    #[arg(
        short = 'C',
        long = "config",
        value_name = "FILE",
        help_heading = "Endpoint",
        help = "Path to config file (defaults to ~/.listpager/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "write-config",
        help_heading = "Endpoint",
        help = "Write a commented default config file (if missing) and exit."
    )]
    pub write_config: bool,

    #[arg(
        short = 'H',
        long = "header",
        value_name = "HEADER",
        help_heading = "Endpoint",
        help = "Extra request header, 'Name: Value'."
    )]
    pub header: Option<String>,

    #[arg(
        long = "proxy",
        value_name = "URL",
        help_heading = "Endpoint",
        help = "HTTP proxy for listing requests."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        help_heading = "Endpoint",
        help = "Request timeout in seconds."
    )]
    pub timeout: Option<u64>,

    #[arg(
        short = 'n',
        long = "name",
        value_name = "NAME",
        help_heading = "View",
        help = "View name under which page size and position are remembered."
    )]
    pub name: Option<String>,

    #[arg(
        long = "page",
        value_name = "INDEX",
        help_heading = "View",
        help = "Zero-based page index to show."
    )]
    pub page: Option<String>,

    #[arg(
        short = 's',
        long = "page-size",
        value_name = "N",
        allow_hyphen_values = true,
        help_heading = "View",
        help = "Items per page (-1 or 'unlimited' for everything)."
    )]
    pub page_size: Option<String>,

    #[arg(
        long = "sort",
        value_name = "COLUMN",
        help_heading = "View",
        help = "Sort column; repeating the current column flips direction."
    )]
    pub sort: Option<String>,

    #[arg(
        long = "sort-desc",
        help_heading = "View",
        help = "Sort descending by default."
    )]
    pub sort_desc: bool,

    #[arg(
        long = "clear-sort",
        help_heading = "View",
        help = "Drop the active sort."
    )]
    pub clear_sort: bool,

    #[arg(
        short = 'r',
        long = "refresh",
        help_heading = "View",
        help = "Reload the current page after other changes."
    )]
    pub refresh: bool,

    #[arg(
        long = "current-url",
        value_name = "URL",
        help_heading = "Errors",
        help = "Page URL used for back-links in server error content."
    )]
    pub current_url: Option<String>,

    #[arg(
        long = "delete-url",
        value_name = "URL",
        help_heading = "Delete",
        help = "Bulk delete endpoint."
    )]
    pub delete_url: Option<String>,

    #[arg(
        long = "delete-param",
        value_name = "NAME",
        help_heading = "Delete",
        help = "Query parameter carrying each record id (default: id)."
    )]
    pub delete_param: Option<String>,

    #[arg(
        long = "delete-id",
        value_name = "ID",
        action = ArgAction::Append,
        help_heading = "Delete",
        help = "Record id to include in the printed delete URL (repeatable)."
    )]
    pub delete_ids: Vec<String>,
}
