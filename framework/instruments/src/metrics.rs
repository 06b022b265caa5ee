use std::collections::HashMap;

use runbench_core::prelude::TrackedCounter;

/// Parse a plain text metrics exposition into counter values.
///
/// Each line is expected to be `<name> <value>`. Comment lines and lines that don't match that
/// shape or whose value is not a float are skipped. If a name repeats, the last value wins.
pub fn parse_counters(payload: &[u8]) -> HashMap<String, f64> {
    let text = String::from_utf8_lossy(payload);

    let mut counters = HashMap::new();
    for line in text.lines() {
        if line.starts_with('#') {
            continue;
        }

        let parts = line.split(' ').collect::<Vec<_>>();
        let [name, value] = parts.as_slice() else {
            continue;
        };

        if let Ok(value) = value.parse::<f64>() {
            counters.insert(name.to_string(), value);
        }
    }

    counters
}

/// Reduce a sequence of scraped payloads to the last positive value of each tracked counter.
///
/// Zero readings, e.g. from a scrape taken before the process registered its metrics, never
/// replace an earlier positive reading. Counters never seen positive are absent from the result.
pub fn last_positive_counters<'a, I>(
    payloads: I,
    tracked: &[TrackedCounter],
) -> HashMap<String, f64>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut result = HashMap::with_capacity(tracked.len());

    for payload in payloads {
        let counters = parse_counters(payload);
        for counter in tracked {
            match counters.get(&counter.name) {
                Some(v) if *v > 0.0 => {
                    result.insert(counter.name.clone(), *v);
                }
                _ => {}
            }
        }
    }

    result
}
