use crate::types::Features;

/// Parses the lines of a FEAT reply into the set of advertised features.
///
/// RFC is specified [RFC 2389](https://datatracker.ietf.org/doc/html/rfc2389#section-3.2).
///
/// This is the syntax of the FEAT response:
///
/// - no-features: "211 [SP] ..."
/// - features-list: "211-...":
///     - ... "feature-label" [[SP] ["description"]]
///     - "211 END"
///
/// Feature lines should be indented by a single space, but some servers do not
/// indent them; every line that is not a `211` header or terminal line counts.
/// Feature names are upper-cased.
pub fn parse_features(lines: &[String]) -> Features {
    let mut features = Features::with_capacity(lines.len());
    for line in lines {
        if line.starts_with("211") {
            trace!("skipping FEAT header/footer {line}");
            continue;
        }
        parse_feature(line, &mut features);
    }
    debug!("server advertises {} features", features.len());
    features
}

/// Parses a single feature line, `feature-label [[SP] params]`
fn parse_feature(line: &str, features: &mut Features) {
    let mut tokens = line.trim().splitn(2, ' ');
    let Some(feature_name) = tokens.next().filter(|x| !x.is_empty()) else {
        return;
    };
    let feature_values = tokens
        .next()
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(str::to_string);
    debug!("found supported feature: {feature_name}: {feature_values:?}");
    features.insert(feature_name.to_ascii_uppercase(), feature_values);
}
