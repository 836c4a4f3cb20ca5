use crate::cli::args::CliArgs;
use crate::pages::PageSize;

pub fn parse_param(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| "expected KEY=VALUE".to_string())?;
    let key = key.trim();
    if key.is_empty() {
        return Err("parameter name is empty".to_string());
    }
    Ok((key.to_string(), value.trim().to_string()))
}

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(raw) = args.page_size.as_deref() {
        raw.parse::<PageSize>()
            .map_err(|e| format!("invalid --page-size '{raw}': {e}"))?;
    }
    for raw in args.params.iter() {
        parse_param(raw).map_err(|e| format!("invalid --param '{raw}': {e}"))?;
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid timeout, expected positive integer".to_string());
        }
    }
    if let Some(format) = args.format.as_deref() {
        if crate::output::OutputFormat::parse(format).is_none() {
            return Err(format!("invalid --format '{format}', expected text or json"));
        }
    }
    if args.clear_sort && args.sort.is_some() {
        return Err("use either --sort or --clear-sort, not both".to_string());
    }
    Ok(())
}
