use crate::LookupError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteFamily {
    V4,
    V6,
}

/// A `route:` or `route6:` object from an IRR database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginRoute {
    pub cidr: String,
    pub family: RouteFamily,
    pub description: Option<String>,
    pub maintainer: Option<String>,
    pub updated: Option<String>,
    pub source: Option<String>,
}

impl OriginRoute {
    fn from_attributes(attributes: &[(String, String)]) -> Option<Self> {
        let (key, cidr) = attributes.first()?;
        let family = match key.as_str() {
            "route" => RouteFamily::V4,
            "route6" => RouteFamily::V6,
            _ => return None,
        };

        let first = |wanted: &[&str]| {
            attributes
                .iter()
                .find(|(key, _)| wanted.contains(&key.as_str()))
                .map(|(_, value)| value.clone())
        };

        Some(Self {
            cidr: cidr.clone(),
            family,
            description: first(&["descr"]),
            maintainer: first(&["mnt-by"]),
            updated: first(&["last-modified", "changed"]),
            source: first(&["source"]),
        })
    }
}

/// Parses the RPSL text returned for an inverse `origin` query into the
/// route objects it contains.
///
/// Objects are separated by blank lines; each line is `key: value`, and a
/// line beginning with whitespace or `+` continues the previous value.
/// Lines starting with `%` or `#` are server remarks.
pub fn parse_origin_response(text: &str) -> Result<Vec<OriginRoute>, LookupError> {
    let mut routes = vec![];
    let mut attributes: Vec<(String, String)> = vec![];

    let mut flush = |attributes: &mut Vec<(String, String)>| {
        if let Some(route) = OriginRoute::from_attributes(attributes) {
            routes.push(route);
        }
        attributes.clear();
    };

    for line in text.lines() {
        let line = line.trim_end();

        if line.is_empty() {
            flush(&mut attributes);
            continue;
        }

        if let Some(remark) = line.strip_prefix('%') {
            let remark = remark.trim_start();
            if remark.to_ascii_lowercase().contains("no entries found") {
                continue;
            }
            if let Some(message) = remark.strip_prefix("ERROR") {
                return Err(LookupError::Server {
                    message: message.trim_start_matches(':').trim().to_string(),
                });
            }
            continue;
        }
        if line.starts_with('#') {
            continue;
        }

        if line.starts_with(|c: char| c.is_whitespace() || c == '+') {
            if let Some((_, value)) = attributes.last_mut() {
                let more = line.trim_start_matches('+').trim();
                if !more.is_empty() {
                    if !value.is_empty() {
                        value.push(' ');
                    }
                    value.push_str(more);
                }
            }
            continue;
        }

        match line.split_once(':') {
            Some((key, value)) => {
                attributes.push((key.trim().to_ascii_lowercase(), value.trim().to_string()));
            }
            None => {
                tracing::debug!("ignoring unexpected whois line {line:?}");
            }
        }
    }
    flush(&mut attributes);

    Ok(routes)
}

#[cfg(test)]
mod test {
    use super::*;
    use indoc::indoc;

    const RESPONSE: &str = indoc! {"
        % Information related to 'AS24203'

        route:          112.215.0.0/17
        descr:          PT. Excelcomindo Pratama
                        Jakarta, Indonesia
        origin:         AS24203
        mnt-by:         MAINT-AS24203
        last-modified:  2019-02-12T03:10:25Z
        source:         RADB

        # remark between objects
        route6:         2001:db8::/32
        descr:          v6 block
        origin:         AS24203
        source:         RADB

        route:          112.215.128.0/18
        origin:         AS24203
        changed:        noc@example.net 20120101
        +               continued
        source:         APNIC

        aut-num:        AS24203
        as-name:        EXCELCOMINDO
    "};

    #[test]
    fn parse_routes() {
        let routes = parse_origin_response(RESPONSE).unwrap();
        k9::assert_equal!(
            routes,
            vec![
                OriginRoute {
                    cidr: "112.215.0.0/17".to_string(),
                    family: RouteFamily::V4,
                    description: Some("PT. Excelcomindo Pratama Jakarta, Indonesia".to_string()),
                    maintainer: Some("MAINT-AS24203".to_string()),
                    updated: Some("2019-02-12T03:10:25Z".to_string()),
                    source: Some("RADB".to_string()),
                },
                OriginRoute {
                    cidr: "2001:db8::/32".to_string(),
                    family: RouteFamily::V6,
                    description: Some("v6 block".to_string()),
                    maintainer: None,
                    updated: None,
                    source: Some("RADB".to_string()),
                },
                OriginRoute {
                    cidr: "112.215.128.0/18".to_string(),
                    family: RouteFamily::V4,
                    description: None,
                    maintainer: None,
                    updated: Some("noc@example.net 20120101 continued".to_string()),
                    source: Some("APNIC".to_string()),
                },
            ]
        );
    }

    #[test]
    fn no_entries() {
        let routes =
            parse_origin_response("%  No entries found for the selected source(s).\n").unwrap();
        assert!(routes.is_empty());
        assert!(parse_origin_response("").unwrap().is_empty());
    }

    #[test]
    fn server_error() {
        let err = parse_origin_response("%ERROR:201: access denied\n").unwrap_err();
        k9::assert_equal!(
            err.to_string(),
            "whois server returned an error: 201: access denied"
        );
    }
}
