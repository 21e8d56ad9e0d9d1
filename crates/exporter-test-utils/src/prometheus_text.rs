//! Lookup of single samples in Prometheus text exposition output.

/// Value of the sample `name` whose label set is exactly `labels`.
///
/// Comment lines are skipped. Label order does not matter.
pub fn find_sample(rendered: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    rendered
        .lines()
        .filter(|line| !line.starts_with('#'))
        .filter_map(parse_line)
        .find(|sample| {
            sample.name == name
                && sample.labels.len() == labels.len()
                && labels
                    .iter()
                    .all(|(k, v)| sample.labels.iter().any(|(sk, sv)| sk == k && sv == v))
        })
        .map(|sample| sample.value)
}

struct Sample {
    name: String,
    labels: Vec<(String, String)>,
    value: f64,
}

fn parse_line(line: &str) -> Option<Sample> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (name, rest) = match line.find(|c| c == '{' || c == ' ') {
        Some(idx) => line.split_at(idx),
        None => return None,
    };

    let (labels, rest) = if let Some(body) = rest.strip_prefix('{') {
        parse_labels(body)?
    } else {
        (Vec::new(), rest)
    };

    let value = rest.split_whitespace().next()?.parse().ok()?;
    Some(Sample {
        name: name.to_string(),
        labels,
        value,
    })
}

/// Parse `k="v",...}` and return the labels plus the remainder after `}`.
fn parse_labels(mut input: &str) -> Option<(Vec<(String, String)>, &str)> {
    let mut labels = Vec::new();
    loop {
        input = input.trim_start_matches(',');
        if let Some(rest) = input.strip_prefix('}') {
            return Some((labels, rest));
        }

        let (key, rest) = input.split_once("=\"")?;
        let mut value = String::new();
        let mut chars = rest.char_indices();
        let end = loop {
            match chars.next()? {
                (_, '\\') => match chars.next()? {
                    (_, 'n') => value.push('\n'),
                    (_, c) => value.push(c),
                },
                (i, '"') => break i,
                (_, c) => value.push(c),
            }
        };
        labels.push((key.to_string(), value));
        input = &rest[end + 1..];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RENDERED: &str = "\
# HELP build_fetch_requests_total Build metric requests made to Azure DevOps
# TYPE build_fetch_requests_total counter
build_fetch_requests_total{org=\"o\",project=\"p\",definition=\"1\",success=\"1\"} 3
build_metric_value{target=\"o/p/1\",name=\"a \\\"quoted\\\" name\",scope=\"s\",date=\"d\"} 42
ado_exporter_build_info{version=\"0.1.0\"} 1
process_start_time_seconds 1700000000
";

    #[test]
    fn test_find_sample_with_labels_in_any_order() {
        let value = find_sample(
            RENDERED,
            "build_fetch_requests_total",
            &[
                ("success", "1"),
                ("org", "o"),
                ("definition", "1"),
                ("project", "p"),
            ],
        );
        assert_eq!(value, Some(3.0));
    }

    #[test]
    fn test_find_sample_unescapes_label_values() {
        let value = find_sample(
            RENDERED,
            "build_metric_value",
            &[
                ("target", "o/p/1"),
                ("name", "a \"quoted\" name"),
                ("scope", "s"),
                ("date", "d"),
            ],
        );
        assert_eq!(value, Some(42.0));
    }

    #[test]
    fn test_find_sample_without_labels() {
        assert_eq!(
            find_sample(RENDERED, "process_start_time_seconds", &[]),
            Some(1_700_000_000.0)
        );
    }

    #[test]
    fn test_find_sample_missing() {
        assert_eq!(find_sample(RENDERED, "build_info", &[]), None);
        assert_eq!(
            find_sample(RENDERED, "ado_exporter_build_info", &[("version", "9.9.9")]),
            None
        );
    }
}
