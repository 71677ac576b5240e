//! Line commands accepted on stdin by `weathermap watch`.

use chrono::NaiveDate;
use weathermap_core::{LocationRegistry, Tier};
use weathermap_map::{SessionCommand, WeatherCategory};

pub const HELP: &str = "commands: counties | date YYYY-MM-DD | filter sunny|cloudy|rain|snow|none | refresh | click <name>";

/// Parses one input line. Names given to `click` are looked up in the city
/// tier first, then the county tier.
///
/// # Errors
///
/// Returns a human-readable message for anything unrecognized.
pub fn parse_command(line: &str, registry: &LocationRegistry) -> Result<SessionCommand, String> {
    let mut parts = line.split_whitespace();
    let verb = parts.next().unwrap_or_default();
    let arg = parts.collect::<Vec<_>>().join(" ");

    match verb {
        "counties" => Ok(SessionCommand::ToggleSecondary),
        "refresh" => Ok(SessionCommand::Refresh),
        "date" => arg
            .parse::<NaiveDate>()
            .map(SessionCommand::SelectDate)
            .map_err(|e| format!("invalid date '{arg}': {e}")),
        "filter" => match arg.as_str() {
            "none" | "" => Ok(SessionCommand::ApplyFilter(None)),
            other => other
                .parse::<WeatherCategory>()
                .map(|c| SessionCommand::ApplyFilter(Some(c)))
                .map_err(|e| e.to_string()),
        },
        "click" => [Tier::Primary, Tier::Secondary]
            .into_iter()
            .find_map(|tier| {
                registry
                    .entries(tier)
                    .find(|(_, location)| location.name == arg)
                    .map(|(id, _)| SessionCommand::Click(id))
            })
            .ok_or_else(|| format!("unknown location '{arg}'")),
        "" => Err(HELP.to_owned()),
        other => Err(format!("unknown command '{other}'; {HELP}")),
    }
}
