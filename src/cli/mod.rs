//! CLI argument parsing

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "http-loadgen")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Target request rate, in requests per second
    #[arg(
        value_name = "TARGET_REQUEST_RATE_PER_SEC",
        value_parser = parse_target_rate,
        allow_negative_numbers = true
    )]
    pub target_rate: f64,
}

/// Accept only positive, finite rates
fn parse_target_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("could not parse `{s}` as a number of requests per second"))?;

    if !rate.is_finite() || rate <= 0.0 {
        return Err(format!("target rate must be a positive number, got `{s}`"));
    }
    Ok(rate)
}
