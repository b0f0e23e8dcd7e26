//! Callback URI parsing
//!
//! Every platform entry point (page URL, deep-link event, initial
//! launch URL) funnels the observed URI through this parser before
//! handing it to the coordinator. A URI carrying neither `code` nor
//! `error` is a valid no-op (an unrelated deep link), not a failure.

/// Parameters extracted from an observed callback URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    /// Authorization code, when the provider granted one
    pub code: Option<String>,
    /// Provider error code, e.g. "access_denied"
    pub error: Option<String>,
    /// Human-readable provider error description
    pub error_description: Option<String>,
    /// The URI the payload was parsed from
    pub raw: String,
}

impl CallbackPayload {
    /// Parse an observed URI, reading parameters from the query
    /// string and, failing that, from the fragment (some providers
    /// return parameters after `#`).
    pub fn parse(uri: &str) -> Self {
        let mut payload = Self {
            code: None,
            error: None,
            error_description: None,
            raw: uri.to_string(),
        };

        let query = uri.split_once('?').map(|(_, rest)| rest);
        let fragment = uri.split_once('#').map(|(_, rest)| rest);

        for section in [query, fragment].into_iter().flatten() {
            // A query section may still carry a fragment suffix
            let section = section.split_once('#').map_or(section, |(q, _)| q);
            for pair in section.split('&') {
                let Some((key, value)) = pair.split_once('=') else {
                    continue;
                };
                let value = urlencoding::decode(value)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| value.to_string());
                match key {
                    "code" if payload.code.is_none() => payload.code = Some(value),
                    "error" if payload.error.is_none() => payload.error = Some(value),
                    "error_description" if payload.error_description.is_none() => {
                        payload.error_description = Some(value)
                    }
                    _ => {}
                }
            }
        }

        payload
    }

    /// Neither `code` nor `error` present: an unrelated URI that must
    /// not be treated as a flow failure
    pub fn is_noop(&self) -> bool {
        self.code.is_none() && self.error.is_none()
    }
}
