use std::collections::BTreeSet;

use super::Rejection;

/// Split a message body into its command token and raw parameter string.
///
/// Bodies containing a colon split on the first colon, anything else on the
/// first space. The parameter string is `None` when there is no separator.
#[must_use]
pub fn split(body: &str) -> (&str, Option<&str>) {
    let body = body.trim();
    let separator = if body.contains(':') { ':' } else { ' ' };
    match body.split_once(separator) {
        Some((command, params)) => (command.trim(), Some(params)),
        None => (body, None),
    }
}

/// Parse a comma-separated parameter list into a set of trimmed values.
///
/// Empty pieces are dropped; a list without any value is a
/// [`Rejection::MissingParameter`].
pub fn read_parameters(params: Option<&str>) -> Result<BTreeSet<String>, Rejection> {
    let values: BTreeSet<String> = params
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .collect();
    if values.is_empty() {
        Err(Rejection::MissingParameter)
    } else {
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn split_on_space() {
        assert_eq!(split("add rust, go"), ("add", Some("rust, go")));
    }

    #[test]
    fn split_on_first_colon() {
        assert_eq!(split("add: rust, go"), ("add", Some(" rust, go")));
        assert_eq!(split("limit: a:b"), ("limit", Some(" a:b")));
    }

    #[test]
    fn colon_anywhere_wins_over_space() {
        assert_eq!(split("search foo:bar"), ("search foo", Some("bar")));
    }

    #[test]
    fn bare_command() {
        assert_eq!(split("  help  "), ("help", None));
        assert_eq!(split(""), ("", None));
    }

    #[test]
    fn command_is_trimmed() {
        assert_eq!(split("add : rust"), ("add", Some(" rust")));
    }

    #[test]
    fn parameters_are_trimmed_and_deduplicated() {
        assert_eq!(
            read_parameters(Some(" rust ,go,rust,  ")),
            Ok(set(&["go", "rust"]))
        );
    }

    #[test]
    fn missing_parameters() {
        assert_eq!(read_parameters(None), Err(Rejection::MissingParameter));
        assert_eq!(read_parameters(Some("")), Err(Rejection::MissingParameter));
        assert_eq!(read_parameters(Some(" , ,")), Err(Rejection::MissingParameter));
    }
}
