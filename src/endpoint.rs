//! Endpoint templates and resolution.
//!
//! Services declare their API surface as named URL templates with `{name}`
//! placeholders (e.g. a build identifier substituted at request time).
//! Rendering is a pure function of the config and the supplied parameters;
//! a partially-substituted URL is never returned.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Named endpoints a service config may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointName {
    /// Browser-facing site, used by the session bootstrap step.
    Website,
    /// Manifest/playback-path endpoint.
    Manifest,
    /// License server endpoint.
    Licence,
    /// Title metadata endpoint.
    Metadata,
}

impl EndpointName {
    /// Lowercase name as it appears in service configs.
    pub fn as_str(self) -> &'static str {
        match self {
            EndpointName::Website => "website",
            EndpointName::Manifest => "manifest",
            EndpointName::Licence => "licence",
            EndpointName::Metadata => "metadata",
        }
    }
}

impl fmt::Display for EndpointName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Extract the placeholder names of a template, in order of appearance.
///
/// Unbalanced braces and empty or non-identifier placeholder names are
/// configuration errors.
pub(crate) fn placeholders(template: &str) -> Result<Vec<&str>> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            Error::Config(format!("Unbalanced '{{' in endpoint template {:?}", template))
        })?;
        let name = &after[..end];
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::Config(format!(
                "Invalid placeholder {:?} in endpoint template {:?}",
                name, template
            )));
        }
        found.push(name);
        rest = &after[end + 1..];
    }
    Ok(found)
}

/// Renders named endpoint templates against runtime parameters.
#[derive(Debug)]
pub struct EndpointRouter<'a> {
    endpoints: &'a HashMap<EndpointName, String>,
}

impl<'a> EndpointRouter<'a> {
    /// Create a router over a service's endpoint table.
    pub fn new(endpoints: &'a HashMap<EndpointName, String>) -> Self {
        Self { endpoints }
    }

    /// Read-only view of a raw endpoint template.
    pub fn template(&self, name: EndpointName) -> Result<&'a str> {
        self.endpoints
            .get(&name)
            .map(String::as_str)
            .ok_or_else(|| Error::UnknownEndpoint(name.to_string()))
    }

    /// Render an endpoint URL, substituting every placeholder from `params`.
    ///
    /// Fails when the endpoint is not configured or a placeholder has no
    /// parameter value; nothing is returned on failure.
    pub fn render(&self, name: EndpointName, params: &HashMap<String, String>) -> Result<String> {
        let template = self.template(name)?;

        let mut url = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find('{') {
            url.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after.find('}').ok_or_else(|| {
                Error::Config(format!("Unbalanced '{{' in endpoint template {:?}", template))
            })?;
            let key = &after[..end];
            match params.get(key) {
                Some(value) => url.push_str(value),
                None => {
                    return Err(Error::MissingParam {
                        endpoint: name.to_string(),
                        param: key.to_string(),
                    });
                }
            }
            rest = &after[end + 1..];
        }
        url.push_str(rest);
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{placeholders, EndpointName, EndpointRouter};
    use crate::error::Error;

    fn endpoints() -> HashMap<EndpointName, String> {
        HashMap::from([(
            EndpointName::Website,
            "https://x/{build_id}/pathEvaluator".to_string(),
        )])
    }

    #[test]
    fn render_substitutes_params() {
        let table = endpoints();
        let router = EndpointRouter::new(&table);
        let params = HashMap::from([("build_id".to_string(), "12345".to_string())]);

        let url = router
            .render(EndpointName::Website, &params)
            .expect("render");
        assert_eq!(url, "https://x/12345/pathEvaluator");

        // Pure: same inputs, same output.
        let again = router
            .render(EndpointName::Website, &params)
            .expect("render");
        assert_eq!(again, url);
        assert!(!url.contains('{'));
    }

    #[test]
    fn render_fails_on_missing_param() {
        let table = endpoints();
        let router = EndpointRouter::new(&table);

        let err = router
            .render(EndpointName::Website, &HashMap::new())
            .expect_err("missing param should fail");
        assert!(matches!(
            err,
            Error::MissingParam { ref param, .. } if param == "build_id"
        ));
    }

    #[test]
    fn render_fails_on_unknown_endpoint() {
        let table = endpoints();
        let router = EndpointRouter::new(&table);

        let err = router
            .render(EndpointName::Licence, &HashMap::new())
            .expect_err("unknown endpoint should fail");
        assert!(matches!(err, Error::UnknownEndpoint(_)));
    }

    #[test]
    fn placeholders_in_order() {
        let names = placeholders("https://x/{build_id}/t/{title_id}").expect("scan");
        assert_eq!(names, vec!["build_id", "title_id"]);
        assert!(placeholders("https://x/static").expect("scan").is_empty());
    }

    #[test]
    fn placeholders_reject_malformed_templates() {
        placeholders("https://x/{build_id").expect_err("unbalanced should fail");
        placeholders("https://x/{}").expect_err("empty name should fail");
        placeholders("https://x/{a{b}").expect_err("nested brace should fail");
    }
}
